mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use uuid::Uuid;

const SESSION: &str = "6f1c2d3e-4b5a-4c7d-8e9f-0a1b2c3d4e5f";

fn register_body(email: &str, password: &str, confirm: &str, next: &str) -> String {
    format!(
        "firstName=Yacine&lastName=Benali&email={}&phone=0661223344&password={}&confirmPassword={}&next={}",
        common::urlencode(email),
        common::urlencode(password),
        common::urlencode(confirm),
        common::urlencode(next),
    )
}

fn login_body(email: &str, password: &str) -> String {
    format!(
        "email={}&password={}",
        common::urlencode(email),
        common::urlencode(password)
    )
}

fn location(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn register_then_login_sets_session_cookies() {
    let (state, store) = common::test_state();
    let app = common::app(&state);
    let cookie = format!("session_id={SESSION}");

    let response = common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("Yacine@Example.DZ", "secret1", "secret1", "/checkout"),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/checkout");
    let cookies = common::set_cookies(&response);
    assert!(cookies.contains(&format!("session_id={SESSION}")));
    assert!(cookies.contains(&"customer_auth=true".to_string()));

    let profile = store.profiles.lock().unwrap()[0].clone();
    assert_eq!(profile.email.as_deref(), Some("yacine@example.dz"));
    assert!(profile.credentials().is_some());

    // A login from another browser lands on the profile's own session.
    let response = common::send(
        &app,
        common::form_post("/api/auth/login", &login_body("yacine@example.dz", "secret1"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account");
    let cookies = common::set_cookies(&response);
    assert!(cookies.contains(&format!("session_id={SESSION}")));
    assert!(cookies.contains(&"customer_auth=true".to_string()));

    assert_eq!(
        store.audit_actions(),
        vec!["customer_register".to_string(), "customer_login".to_string()]
    );
}

#[tokio::test]
async fn failed_login_is_generic_and_sets_no_cookie() {
    let (state, _store) = common::test_state();
    let app = common::app(&state);

    common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("amel@example.dz", "secret1", "secret1", ""),
            Some(&format!("session_id={SESSION}")),
        ),
    )
    .await;

    let response = common::send(
        &app,
        common::form_post("/api/auth/login", &login_body("amel@example.dz", "wrong-pass"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(common::set_cookies(&response).is_empty());
    let body = common::json_body(response).await;
    assert_eq!(body["data"]["error"], "invalid email or password");

    let response = common::send(
        &app,
        common::form_post("/api/auth/login", &login_body("nobody@example.dz", "secret1"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(common::set_cookies(&response).is_empty());
    let body = common::json_body(response).await;
    assert_eq!(body["data"]["error"], "account not found");
}

#[tokio::test]
async fn registration_validation_errors() {
    let (state, store) = common::test_state();
    let app = common::app(&state);

    let cases = [
        (register_body("not-an-email", "secret1", "secret1", ""), "invalid email address"),
        (register_body("a@b.dz", "12345", "12345", ""), "password must be at least 6 characters"),
        (register_body("a@b.dz", "secret1", "secret2", ""), "passwords do not match"),
        (
            "email=a%40b.dz&password=secret1&confirmPassword=secret1".to_string(),
            "first name, last name and phone are required",
        ),
    ];
    for (body, message) in cases {
        let response = common::send(&app, common::form_post("/api/auth/register", &body, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(common::set_cookies(&response).is_empty());
        let json = common::json_body(response).await;
        assert_eq!(json["data"]["error"], message);
    }
    assert!(store.profiles.lock().unwrap().is_empty());
}

#[tokio::test]
async fn registered_email_cannot_register_again() {
    let (state, _store) = common::test_state();
    let app = common::app(&state);
    let body = register_body("karim@example.dz", "secret1", "secret1", "");

    let first = common::send(
        &app,
        common::form_post("/api/auth/register", &body, Some(&format!("session_id={SESSION}"))),
    )
    .await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    let other_browser = format!("session_id={}", Uuid::new_v4());
    let second = common::send(
        &app,
        common::form_post("/api/auth/register", &body, Some(&other_browser)),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = common::json_body(second).await;
    assert_eq!(json["data"]["error"], "email already used - log in instead");
}

#[tokio::test]
async fn registration_adopts_guest_profile_session() {
    let (state, store) = common::test_state();
    let app = common::app(&state);
    let guest_session = Uuid::new_v4();
    store.add_guest_profile(guest_session, "nadia@example.dz");

    let response = common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("nadia@example.dz", "secret1", "secret1", "/cart"),
            Some(&format!("session_id={SESSION}")),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(common::set_cookies(&response).contains(&format!("session_id={guest_session}")));

    let profiles = store.profiles.lock().unwrap();
    assert_eq!(profiles.len(), 1);
    assert!(profiles[0].credentials().is_some());
    assert_eq!(profiles[0].first_name, "Yacine");
}

#[tokio::test]
async fn second_account_from_registered_browser_gets_new_session() {
    let (state, store) = common::test_state();
    let app = common::app(&state);
    let cookie = format!("session_id={SESSION}");

    common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("first@example.dz", "secret1", "secret1", ""),
            Some(&cookie),
        ),
    )
    .await;
    let response = common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("second@example.dz", "secret1", "secret1", ""),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookies = common::set_cookies(&response);
    let session = cookies
        .iter()
        .find_map(|c| c.strip_prefix("session_id="))
        .expect("session cookie");
    assert_ne!(session, SESSION);
    assert_eq!(store.profiles.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn redirect_target_is_sanitized() {
    let (state, _store) = common::test_state();
    let app = common::app(&state);

    for (i, next) in [
        "//evil.example",
        "https://evil.example",
        "/login",
        "/register/x",
        "/a\nb",
        "/orders\r\nX-Injected: 1",
    ]
    .into_iter()
    .enumerate()
    {
        let email = format!("user{i}@example.dz");
        let response = common::send(
            &app,
            common::form_post(
                "/api/auth/register",
                &register_body(&email, "secret1", "secret1", next),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/account", "next = {next}");
    }
}

#[tokio::test]
async fn logout_clears_only_the_auth_marker() {
    let (state, _store) = common::test_state();
    let app = common::app(&state);

    let response = common::send(
        &app,
        Request::post("/api/auth/logout")
            .header(header::COOKIE, format!("session_id={SESSION}; customer_auth=true"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let removal = common::set_cookie_header(&response, "customer_auth").expect("removal cookie");
    assert!(removal.contains("Max-Age=0"));
    assert!(common::set_cookie_header(&response, "session_id").is_none());
}

#[tokio::test]
async fn profile_requires_auth_marker() {
    let (state, _store) = common::test_state();
    let app = common::app(&state);

    common::send(
        &app,
        common::form_post(
            "/api/auth/register",
            &register_body("leila@example.dz", "secret1", "secret1", ""),
            Some(&format!("session_id={SESSION}")),
        ),
    )
    .await;

    let anonymous = common::send(
        &app,
        Request::get("/api/account/profile")
            .header(header::COOKIE, format!("session_id={SESSION}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let response = common::send(
        &app,
        Request::get("/api/account/profile")
            .header(header::COOKIE, format!("session_id={SESSION}; customer_auth=true"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    assert_eq!(body["data"]["email"], "leila@example.dz");
    assert_eq!(body["data"]["registered"], true);
    assert!(body["data"].get("password_hash").is_none());
}
