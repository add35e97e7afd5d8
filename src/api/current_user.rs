//! Current user service
//!
//! Get the current user from the request based on the session cookie. The
//! session itself is created by the login callback; anything missing,
//! unknown or expired is unauthorized and the client is expected to start a
//! new login round trip.

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use uuid::Uuid;

use crate::api::Error;
use crate::storage::Storage;
use crate::users::User;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "feedbase_session";

/// Current user service
pub struct CurrentUser<S> {
    /// The actual user
    user: Arc<User>,

    /// The storage flavor the user was resolved through
    storage: PhantomData<S>,
}

impl<S> CurrentUser<S> {
    /// Create the current user from a user
    fn new(user: User) -> Self {
        Self {
            user: Arc::new(user),
            storage: PhantomData,
        }
    }
}

impl<S> Deref for CurrentUser<S> {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<B, S> FromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &B) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let session_id = jar
            .get(SESSION_COOKIE)
            .ok_or_else(|| Error::unauthorized("Unauthorized"))?
            .value();

        let session_id =
            Uuid::parse_str(session_id).map_err(|_| Error::unauthorized("Unauthorized"))?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get a storage pool"))?;

        let session = storage
            .find_single_session_by_id(&session_id)
            .await
            .map_err(Error::internal_server_error)?
            .ok_or_else(|| Error::unauthorized("Unauthorized"))?;

        if session.is_expired(Utc::now().naive_utc()) {
            // expired sessions are cleaned up on sight
            if let Err(err) = storage.delete_session(&session).await {
                tracing::error!("Could not delete expired session: {err}");
            }

            return Err(Error::unauthorized("Session expired"));
        }

        let user = storage
            .find_single_user_by_id(&session.user_id)
            .await
            .map_err(Error::internal_server_error)?;

        user.map_or_else(
            || Err(Error::unauthorized("Unauthorized")),
            |user| Ok(CurrentUser::new(user)),
        )
    }
}
