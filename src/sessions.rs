use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A login session
///
/// The session ID is the opaque value of the session cookie; the login
/// itself is delegated to the external identity provider.
#[derive(Clone, Debug)]
pub struct Session {
    /// Session ID
    pub id: Uuid,

    /// The user this session belongs to
    pub user_id: Uuid,

    /// Sessions past this point are unauthorized
    pub expires_at: NaiveDateTime,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl Session {
    /// Is the session past its expiry?
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at < now
    }
}
