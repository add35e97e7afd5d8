//! Login, logout and the current user profile
//!
//! The login itself is delegated to an external OIDC identity provider:
//! `/api/login` redirects to its authorize endpoint, `/api/callback` turns
//! the ID token it issued into an upserted user plus a session cookie. No
//! local credentials exist.

use axum::Extension;
use axum::extract::Query;
use axum::response::Redirect;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::sessions::Session;
use crate::storage::CreateSessionValues;
use crate::storage::Storage;
use crate::storage::UpsertUserValues;
use crate::templates::ensure_default_templates;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Success;
use super::current_user::SESSION_COOKIE;

/// How long a session stays valid
const SESSION_LIFETIME_DAYS: i64 = 7;

/// Everything needed to talk to the identity provider
#[derive(Clone)]
pub struct AuthConfig {
    /// The authorize endpoint of the provider
    authorize_url: Url,

    /// Client ID registered with the provider
    client_id: String,

    /// Where the provider sends the browser back to
    redirect_uri: String,

    /// Key to decode ID tokens with
    decoding: DecodingKey,
}

impl AuthConfig {
    /// Create a new auth configuration, with the decoding key derived from
    /// the client secret
    pub fn new(authorize_url: Url, client_id: String, redirect_uri: String, secret: &[u8]) -> Self {
        Self {
            authorize_url,
            client_id,
            redirect_uri,
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The identity claims of an ID token
///
/// Standard OIDC claim names; the subject doubles as the user ID and is
/// expected to be a UUID.
#[derive(Debug, Deserialize, Serialize)]
struct IdentityClaims {
    /// Subject, the user ID at the provider
    sub: Uuid,

    /// Email address
    email: Option<String>,

    /// First name
    given_name: Option<String>,

    /// Last name
    family_name: Option<String>,

    /// URL of the profile image
    picture: Option<String>,

    /// Expiry of the token as a UNIX timestamp
    exp: i64,
}

/// Kick off a login round trip with the identity provider
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/login
/// ```
///
/// Redirects to the provider's authorize endpoint; the provider sends the
/// browser back to `/api/callback`.
pub async fn login(Extension(config): Extension<AuthConfig>) -> Redirect {
    let mut authorize_url = config.authorize_url.clone();

    authorize_url
        .query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "id_token")
        .append_pair("scope", "openid email profile");

    Redirect::temporary(authorize_url.as_str())
}

/// Callback query parameters, filled in by the identity provider
#[derive(Debug, Deserialize)]
pub struct CallbackParameters {
    /// The ID token issued by the provider
    id_token: String,
}

/// Finish the login round trip
///
/// Decodes the ID token, upserts the user from its claims (first login
/// creates the account and seeds the starter templates), creates a session
/// and plants the session cookie.
pub async fn callback<S: Storage>(
    Extension(config): Extension<AuthConfig>,
    Extension(storage): Extension<S>,
    jar: CookieJar,
    Query(parameters): Query<CallbackParameters>,
) -> Result<(CookieJar, Redirect), Error> {
    let claims = decode_identity(&config, &parameters.id_token)?;

    let values = UpsertUserValues {
        id: &claims.sub,
        email: claims.email.as_deref(),
        first_name: claims.given_name.as_deref(),
        last_name: claims.family_name.as_deref(),
        profile_image_url: claims.picture.as_deref(),
    };

    let user = storage
        .upsert_user(&values)
        .await
        .map_err(Error::internal_server_error)?;

    ensure_default_templates(&storage, &user)
        .await
        .map_err(Error::internal_server_error)?;

    let session = create_session(&storage, &user).await?;

    tracing::debug!("User {} logged in", user.id);

    let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
        .path("/")
        .http_only(true)
        .build();

    Ok((jar.add(cookie), Redirect::to("/")))
}

/// End the session
///
/// Clears the session cookie and forgets the session; safe to call without
/// one.
pub async fn logout<S: Storage>(
    Extension(storage): Extension<S>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), Error> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(session_id) = Uuid::parse_str(cookie.value()) {
            let session = storage
                .find_single_session_by_id(&session_id)
                .await
                .map_err(Error::internal_server_error)?;

            if let Some(session) = session {
                storage
                    .delete_session(&session)
                    .await
                    .map_err(Error::internal_server_error)?;
            }
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/");

    Ok((jar.remove(removal), Redirect::to("/")))
}

/// The user profile served to the dashboard
///
/// Includes the public feedback link token the dashboard builds the
/// shareable link and QR code from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: Option<String>,

    /// First name
    pub first_name: Option<String>,

    /// Last name
    pub last_name: Option<String>,

    /// URL of the profile image
    pub profile_image_url: Option<String>,

    /// Public feedback link token
    pub feedback_link_id: Uuid,
}

impl UserResponse {
    /// Create a response from a [`User`](User)
    fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            feedback_link_id: user.feedback_link_id,
        }
    }
}

/// Get the profile of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Cookie: feedbase_session=<uuid>' \
///     http://localhost:6000/api/auth/user
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "feedbackLinkId": "<uuid>" ... } }
/// ```
pub async fn current<S: Storage>(
    current_user: CurrentUser<S>,
) -> Result<Success<UserResponse>, Error> {
    use std::ops::Deref;

    Ok(Success::ok(UserResponse::from_user(
        current_user.deref().clone(),
    )))
}

/// Decode and verify an ID token into identity claims
fn decode_identity(config: &AuthConfig, id_token: &str) -> Result<IdentityClaims, Error> {
    use jsonwebtoken::decode;

    let token_data = decode::<IdentityClaims>(id_token, &config.decoding, &Validation::default())
        .map_err(|err| Error::unauthorized(format!("Invalid identity token: {err}")))?;

    Ok(token_data.claims)
}

/// Create a fresh session for a user
async fn create_session<S: Storage>(storage: &S, user: &User) -> Result<Session, Error> {
    let values = CreateSessionValues {
        user,
        expires_at: Utc::now().naive_utc() + Duration::days(SESSION_LIFETIME_DAYS),
    };

    storage
        .create_session(&values)
        .await
        .map_err(Error::internal_server_error)
}
