//! Insights API endpoint
//!
//! The aggregated dashboard metrics over the current user's feedback

use axum::Extension;

use crate::insights;
use crate::insights::Insights;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;
use super::Success;

/// Get the aggregated metrics of the current user's feedback
///
/// Request:
/// ```sh
/// curl -v -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/insights
/// ```
///
/// Response:
/// ```json
/// { "data": { "averageRating": 4.3, "totalResponses": 12 ... } }
/// ```
pub async fn insights<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<Insights>, Error> {
    let feedback = storage
        .find_all_feedback_by_user(&current_user)
        .await
        .map_err(Error::internal_server_error)?;

    let templates = storage
        .find_all_templates_by_user(&current_user)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(insights::generate(&feedback, &templates)))
}
