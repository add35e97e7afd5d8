//! Utility functions for the API

use uuid::Uuid;

use crate::api::Error;
use crate::storage::Storage;
use crate::users::User;

/// Resolve a public feedback link token to its recipient
///
/// The token is opaque to visitors; anything that does not resolve to
/// exactly one user is an invalid link, including tokens that are not even
/// UUIDs.
pub async fn resolve_recipient<S: Storage>(storage: &S, link_id: &str) -> Result<User, Error> {
    let link_id =
        Uuid::parse_str(link_id).map_err(|_| Error::not_found("Invalid feedback link"))?;

    storage
        .find_single_user_by_feedback_link_id(&link_id)
        .await
        .map_err(Error::internal_server_error)?
        .map_or_else(|| Err(Error::not_found("Invalid feedback link")), Ok)
}
