//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;

pub use auth::AuthConfig;
pub use current_user::CurrentUser;
pub use request::Form;
pub use request::PathParameters;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod auth;
mod current_user;
mod feedback;
mod insights;
mod request;
mod response;
mod templates;
mod utils;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let templates = Router::new()
        .route("/", get(templates::list::<S>))
        .route("/", post(templates::create::<S>))
        .route("/public/{link_id}", get(templates::public_list::<S>))
        .route("/{template}", get(templates::single::<S>))
        .route("/{template}", put(templates::update::<S>))
        .route("/{template}", delete(templates::delete::<S>));

    let feedback = Router::new()
        .route("/", get(feedback::list::<S>))
        .route("/submit/{link_id}", post(feedback::submit::<S>));

    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback::<S>))
        .route("/logout", get(auth::logout::<S>))
        .route("/auth/user", get(auth::current::<S>))
        .route("/insights", get(insights::insights::<S>))
        .nest("/templates", templates)
        .nest("/feedback", feedback)
}
