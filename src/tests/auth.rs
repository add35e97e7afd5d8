use axum::body::Body;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use tower::Service;
use uuid::Uuid;

use crate::tests::helper;

#[tokio::test]
async fn test_unauthorized_without_session() {
    let mut app = helper::setup_test_app().await;

    for uri in [
        "/api/feedback",
        "/api/templates",
        "/api/insights",
        "/api/auth/user",
    ] {
        // no cookie at all
        let status_code = helper::get_status(&mut app, uri, None).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status_code);

        // a cookie that is not even a UUID
        let status_code =
            helper::get_status(&mut app, uri, Some("feedbase_session=not-a-uuid")).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status_code);

        // a cookie for a session that does not exist
        let unknown = format!("feedbase_session={}", Uuid::new_v4());
        let status_code = helper::get_status(&mut app, uri, Some(unknown.as_str())).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status_code);
    }
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let mut app = helper::setup_test_app().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/login")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();

    assert_eq!(StatusCode::TEMPORARY_REDIRECT, response.status());

    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://auth.example.com/authorize?"));
    assert!(location.contains("client_id=feedbase"));
    assert!(location.contains("response_type=id_token"));
    assert!(location.contains("scope=openid+email+profile"));
}

#[tokio::test]
async fn test_callback_rejects_invalid_token() {
    let mut app = helper::setup_test_app().await;

    let (status_code, cookie, _) = helper::maybe_login(&mut app, "garbage").await;

    assert_eq!(StatusCode::UNAUTHORIZED, status_code);
    assert_eq!(None, cookie);
}

#[tokio::test]
async fn test_callback_creates_user_and_session() {
    let mut app = helper::setup_test_app().await;

    let subject = Uuid::new_v4();
    let id_token = helper::identity_token(&subject, "owner@example.com");

    let (status_code, cookie, location) = helper::maybe_login(&mut app, &id_token).await;

    assert_eq!(StatusCode::SEE_OTHER, status_code);
    assert_eq!(Some("/".to_string()), location);

    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("feedbase_session="));

    let (status_code, user) = helper::current_user(&mut app, &cookie).await;
    assert_eq!(StatusCode::OK, status_code);

    let user = user.unwrap();
    assert_eq!(subject, user.id);
    assert_eq!(Some("owner@example.com".to_string()), user.email);
}

#[tokio::test]
async fn test_second_login_upserts() {
    let mut app = helper::setup_test_app().await;

    let subject = Uuid::new_v4();

    let cookie = helper::login(&mut app, &subject).await;
    let link_before = helper::feedback_link(&mut app, &cookie).await;

    // logging in again updates the profile, the feedback link stays
    let cookie = helper::login(&mut app, &subject).await;
    let link_after = helper::feedback_link(&mut app, &cookie).await;

    assert_eq!(link_before, link_after);

    // and the starter templates are not seeded twice
    let (_, templates) = helper::list_templates(&mut app, &cookie).await;
    assert_eq!(4, templates.unwrap().len());
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let mut app = helper::setup_test_app().await;

    let cookie = helper::login_fresh(&mut app).await;

    let (status_code, _) = helper::current_user(&mut app, &cookie).await;
    assert_eq!(StatusCode::OK, status_code);

    let status_code = helper::logout(&mut app, &cookie).await;
    assert_eq!(StatusCode::SEE_OTHER, status_code);

    // the session is gone server-side, replaying the cookie does not help
    let (status_code, _) = helper::current_user(&mut app, &cookie).await;
    assert_eq!(StatusCode::UNAUTHORIZED, status_code);
}
