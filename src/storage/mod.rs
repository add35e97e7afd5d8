//! All things related to the storage of users, sessions, templates and
//! feedback

use async_trait::async_trait;
use chrono::naive::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::feedback::Feedback;
use crate::sessions::Session;
use crate::templates::Category;
use crate::templates::Template;
use crate::users::User;

#[cfg(not(feature = "postgres"))]
use memory::Memory;
#[cfg(feature = "postgres")]
use postgres::Postgres;

#[cfg(not(feature = "postgres"))]
pub mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Setup the storage
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup() -> Memory {
    Memory::new()
}

/// Setup the storage
#[cfg(feature = "postgres")]
pub async fn setup() -> Postgres {
    Postgres::new().await
}

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to upsert a User
///
/// Insert when the ID is new, update of the profile fields otherwise; the
/// feedback link and creation date never change on update.
pub struct UpsertUserValues<'a> {
    /// The user ID, the subject of the identity provider
    pub id: &'a Uuid,

    /// Email address
    pub email: Option<&'a str>,

    /// First name
    pub first_name: Option<&'a str>,

    /// Last name
    pub last_name: Option<&'a str>,

    /// URL of the profile image
    pub profile_image_url: Option<&'a str>,
}

/// Values to create a Session
pub struct CreateSessionValues<'a> {
    /// The user logging in
    pub user: &'a User,

    /// When the session stops being valid
    pub expires_at: NaiveDateTime,
}

/// Values to create a Template
pub struct CreateTemplateValues<'a> {
    /// The owning user
    pub user: &'a User,

    /// Template name
    pub name: &'a str,

    /// Optional description
    pub description: Option<&'a str>,

    /// Ordered list of categories
    pub categories: &'a [Category],

    /// Pre-select this template on submission forms
    ///
    /// Clears the flag on the user's previous default
    pub is_default: bool,
}

/// Values to update a Template, replacing it wholesale
pub struct UpdateTemplateValues<'a> {
    /// New template name
    pub name: &'a str,

    /// New optional description
    pub description: Option<&'a str>,

    /// New ordered list of categories
    pub categories: &'a [Category],

    /// Pre-select this template on submission forms
    ///
    /// Clears the flag on the user's previous default
    pub is_default: bool,
}

/// Values to create a Feedback record
pub struct CreateFeedbackValues<'a> {
    /// The recipient user
    pub user: &'a User,

    /// The template the submission was driven by, if any
    pub template_id: Option<&'a Uuid>,

    /// Star rating, 1 through 5
    pub rating: i32,

    /// Category identifier
    pub category: &'a str,

    /// Free-form comment
    pub comment: &'a str,
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Finds a single user by its ID
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    /// Finds a single user by its public feedback link token
    async fn find_single_user_by_feedback_link_id(&self, link_id: &Uuid)
    -> Result<Option<User>>;

    /// Insert a user, or update its profile fields when the ID exists
    async fn upsert_user(&self, values: &UpsertUserValues) -> Result<User>;

    /// Create a session for a user
    async fn create_session(&self, values: &CreateSessionValues) -> Result<Session>;

    /// Finds a single session by its ID
    async fn find_single_session_by_id(&self, id: &Uuid) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete_session(&self, session: &Session) -> Result<()>;

    /// Find all templates of a user, oldest first
    async fn find_all_templates_by_user(&self, user: &User) -> Result<Vec<Template>>;

    /// Finds a single template by its ID
    async fn find_single_template_by_id(&self, id: &Uuid) -> Result<Option<Template>>;

    /// Create a template
    async fn create_template(&self, values: &CreateTemplateValues) -> Result<Template>;

    /// Update a template owned by the given user, replacing it wholesale
    ///
    /// The ID and the owner are matched in the same operation; `None` when
    /// the template does not exist or is owned by somebody else.
    async fn update_template(
        &self,
        template_id: &Uuid,
        user: &User,
        values: &UpdateTemplateValues,
    ) -> Result<Option<Template>>;

    /// Delete a template owned by the given user
    ///
    /// Feedback referencing the template keeps existing with the reference
    /// nulled. The ID and the owner are matched in the same operation;
    /// `false` when the template does not exist or is owned by somebody
    /// else.
    async fn delete_template(&self, template_id: &Uuid, user: &User) -> Result<bool>;

    /// Find all feedback of a recipient, newest first
    async fn find_all_feedback_by_user(&self, user: &User) -> Result<Vec<Feedback>>;

    /// Create a feedback record
    async fn create_feedback(&self, values: &CreateFeedbackValues) -> Result<Feedback>;
}
