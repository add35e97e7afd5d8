use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A business owner collecting feedback
///
/// Created on first login from the identity provider claims, upserted by ID
/// on every following login.
#[derive(Clone, Debug)]
pub struct User {
    /// User ID, the subject issued by the identity provider
    pub id: Uuid,

    /// Email address
    pub email: Option<String>,

    /// First name
    pub first_name: Option<String>,

    /// Last name
    pub last_name: Option<String>,

    /// URL of the profile image
    pub profile_image_url: Option<String>,

    /// Opaque public token for the shareable feedback link
    ///
    /// Generated once at account creation, stable for the lifetime of the
    /// account; regeneration is not supported.
    pub feedback_link_id: Uuid,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}
