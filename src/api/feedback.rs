//! Feedback API endpoints
//!
//! The public submission endpoint behind the feedback link, and the
//! authenticated listing for the dashboard

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::feedback;
use crate::feedback::Feedback;
use crate::storage::CreateFeedbackValues;
use crate::storage::Storage;
use crate::templates::Template;
use crate::validation::ValidationIssue;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;
use super::utils::resolve_recipient;

/// Feedback response going to the user
///
/// Basically filtering which fields are shown to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    /// Feedback ID
    pub id: Uuid,

    /// Star rating, 1 through 5
    pub rating: i32,

    /// Category identifier
    pub category: String,

    /// Free-form comment
    pub comment: String,

    /// The template the submission was driven by, if any
    pub template_id: Option<Uuid>,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl FeedbackResponse {
    /// Create a response from a [`Feedback`](Feedback) record
    ///
    /// Basically filtering which fields are shown to the user
    fn from_feedback(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            rating: feedback.rating,
            category: feedback.category,
            comment: feedback.comment,
            template_id: feedback.template_id,
            created_at: feedback.created_at,
        }
    }

    /// Create a response from multiple [`Feedback`](Feedback) records
    ///
    /// Basically filtering which fields are shown to the user
    fn from_feedback_multiple(mut feedback: Vec<Feedback>) -> Vec<Self> {
        feedback
            .drain(..)
            .map(Self::from_feedback)
            .collect::<Vec<Self>>()
    }
}

/// List all feedback of the current user, newest first
///
/// Request:
/// ```sh
/// curl -v -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/feedback
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "<uuid>", "rating": 5, "category": "service_quality" ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<Vec<FeedbackResponse>>, Error> {
    let feedback = storage
        .find_all_feedback_by_user(&current_user)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(FeedbackResponse::from_feedback_multiple(
        feedback,
    )))
}

/// Submit feedback form
///
/// Fields a public visitor submits through the feedback link
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackForm {
    /// Star rating, 1 through 5
    rating: i32,

    /// Category identifier, scoped by the template
    category: String,

    /// Free-form comment, up to 500 characters
    comment: String,

    /// The template that drove the submission form, if any
    template_id: Option<Uuid>,
}

/// Submit feedback through a public feedback link
///
/// No session needed; the link resolves the recipient. The submission is
/// validated against the recipient's template (or the fixed category set for
/// template-less submissions) and rejected with field-level details when it
/// does not hold up.
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "rating": 5, "category": "service_quality", "comment": "Great!" }' \
///     http://localhost:6000/api/feedback/submit/<link>
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "rating": 5 ... } }
/// ```
pub async fn submit<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(link_id): PathParameters<String>,
    Form(form): Form<SubmitFeedbackForm>,
) -> Result<Success<FeedbackResponse>, Error> {
    let recipient = resolve_recipient(&storage, &link_id).await?;

    let template = match form.template_id {
        Some(template_id) => {
            match fetch_recipient_template(&storage, &template_id, &recipient.id).await? {
                Some(template) => Some(template),
                None => {
                    // an unknown or foreign template is a validation problem
                    // of the submission, not a missing resource
                    return Err(Error::bad_request("Invalid feedback data").with_details(vec![
                        ValidationIssue::new("templateId", "Unknown template for this recipient"),
                    ]));
                }
            }
        }
        None => None,
    };

    let issues = feedback::validate(form.rating, &form.category, &form.comment, template.as_ref());

    if !issues.is_empty() {
        return Err(Error::bad_request("Invalid feedback data").with_details(issues));
    }

    let values = CreateFeedbackValues {
        user: &recipient,
        template_id: template.as_ref().map(|template| &template.id),
        rating: form.rating,
        category: &form.category,
        comment: &form.comment,
    };

    let feedback = storage
        .create_feedback(&values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::debug!(
        "Feedback {} submitted for recipient {}",
        feedback.id,
        recipient.id
    );

    Ok(Success::ok(FeedbackResponse::from_feedback(feedback)))
}

/// Fetch a template of the recipient from storage
async fn fetch_recipient_template<S: Storage>(
    storage: &S,
    template_id: &Uuid,
    recipient_id: &Uuid,
) -> Result<Option<Template>, Error> {
    let template = storage
        .find_single_template_by_id(template_id)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(template.filter(|template| &template.user_id == recipient_id))
}
