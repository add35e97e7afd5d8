//! Templates API endpoints
//!
//! Everything related to the template management, plus the public template
//! listing behind the feedback link

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::CreateTemplateValues;
use crate::storage::Storage;
use crate::storage::UpdateTemplateValues;
use crate::templates;
use crate::templates::Category;
use crate::templates::Template;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;
use super::utils::resolve_recipient;

/// Template response going to the user
///
/// Basically filtering which fields are shown to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    /// Template ID
    pub id: Uuid,

    /// Template name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Ordered list of rating categories
    pub categories: Vec<Category>,

    /// Pre-selected template of the owner
    pub is_default: bool,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl TemplateResponse {
    /// Create a response from a [`Template`](Template)
    ///
    /// Basically filtering which fields are shown to the user
    fn from_template(template: Template) -> Self {
        Self {
            id: template.id,
            name: template.name,
            description: template.description,
            categories: template.categories,
            is_default: template.is_default,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }

    /// Create a response from multiple [`Template`](Template)s
    ///
    /// Basically filtering which fields are shown to the user
    fn from_template_multiple(mut templates: Vec<Template>) -> Vec<Self> {
        templates
            .drain(..)
            .map(Self::from_template)
            .collect::<Vec<Self>>()
    }
}

/// List all templates of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/templates
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "<uuid>", "name": "Customer Service" ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<Vec<TemplateResponse>>, Error> {
    let templates = storage
        .find_all_templates_by_user(&current_user)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(TemplateResponse::from_template_multiple(
        templates,
    )))
}

/// List the templates behind a public feedback link
///
/// No session needed; an unknown link is an invalid feedback link, an empty
/// list is a recipient without templates.
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/templates/public/<link>
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "<uuid>", "name": "Customer Service" ... } ] }
/// ```
pub async fn public_list<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(link_id): PathParameters<String>,
) -> Result<Success<Vec<TemplateResponse>>, Error> {
    let recipient = resolve_recipient(&storage, &link_id).await?;

    let templates = storage
        .find_all_templates_by_user(&recipient)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(TemplateResponse::from_template_multiple(
        templates,
    )))
}

/// Get a single template of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/templates/<uuid>
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "name": "Customer Service" ... } }
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(template_id): PathParameters<Uuid>,
) -> Result<Success<TemplateResponse>, Error> {
    let template = fetch_owned_template(&storage, &template_id, &current_user).await?;

    Ok(Success::ok(TemplateResponse::from_template(template)))
}

/// Template form
///
/// Fields to create or replace a template with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateForm {
    /// Template name
    name: String,

    /// Optional description
    description: Option<String>,

    /// Ordered list of categories
    categories: Vec<Category>,

    /// Pre-select this template on submission forms
    ///
    /// Clears the flag on the previous default
    is_default: Option<bool>,
}

/// Create a template based on the [`TemplateForm`](TemplateForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Cookie: feedbase_session=<uuid>' \
///     -d '{ "name": "Lunch", "categories": [ { "id": "speed", "label": "Speed" } ] }' \
///     http://localhost:6000/api/templates
/// ```
///
/// Response
/// ```json
/// { "data": { "id": "<uuid>", "name": "Lunch" ... } }
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<TemplateForm>,
) -> Result<Success<TemplateResponse>, Error> {
    let issues = templates::validate(&form.name, form.description.as_deref(), &form.categories);

    if !issues.is_empty() {
        return Err(Error::bad_request("Invalid template data").with_details(issues));
    }

    let values = CreateTemplateValues {
        user: &current_user,
        name: &form.name,
        description: form.description.as_deref(),
        categories: &form.categories,
        is_default: form.is_default.unwrap_or(false),
    };

    let template = storage
        .create_template(&values)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::created(TemplateResponse::from_template(template)))
}

/// Replace a template based on the [`TemplateForm`](TemplateForm) form
///
/// The template is replaced wholesale, there are no partial updates. Only
/// templates of the current user can be touched; everything else reports
/// not found.
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     -H 'Cookie: feedbase_session=<uuid>' \
///     -d '{ "name": "Dinner", "categories": [ { "id": "taste", "label": "Taste" } ] }' \
///     http://localhost:6000/api/templates/<uuid>
/// ```
///
/// Response
/// ```json
/// { "data": { "id": "<uuid>", "name": "Dinner" ... } }
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(template_id): PathParameters<Uuid>,
    Form(form): Form<TemplateForm>,
) -> Result<Success<TemplateResponse>, Error> {
    let issues = templates::validate(&form.name, form.description.as_deref(), &form.categories);

    if !issues.is_empty() {
        return Err(Error::bad_request("Invalid template data").with_details(issues));
    }

    let values = UpdateTemplateValues {
        name: &form.name,
        description: form.description.as_deref(),
        categories: &form.categories,
        is_default: form.is_default.unwrap_or(false),
    };

    let template = storage
        .update_template(&template_id, &current_user, &values)
        .await
        .map_err(Error::internal_server_error)?;

    template.map_or_else(
        || Err(Error::not_found("Template not found")),
        |template| Ok(Success::ok(TemplateResponse::from_template(template))),
    )
}

/// Delete a template
///
/// Unconditional; feedback that referenced the template stays around with
/// the reference nulled. Only templates of the current user can be touched;
/// everything else reports not found.
///
/// Request:
/// ```sh
/// curl -v -XDELETE -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/templates/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(template_id): PathParameters<Uuid>,
) -> Result<Success<&'static str>, Error> {
    let deleted = storage
        .delete_template(&template_id, &current_user)
        .await
        .map_err(Error::internal_server_error)?;

    if deleted {
        Ok(Success::<&'static str>::no_content())
    } else {
        Err(Error::not_found("Template not found"))
    }
}

/// Fetch a template of the current user from storage
async fn fetch_owned_template<S: Storage>(
    storage: &S,
    template_id: &Uuid,
    current_user: &CurrentUser<S>,
) -> Result<Template, Error> {
    storage
        .find_single_template_by_id(template_id)
        .await
        .map_err(Error::internal_server_error)?
        .filter(|template| template.user_id == current_user.id)
        .map_or_else(|| Err(Error::not_found("Template not found")), Ok)
}
