//! End-to-end request flows through the full router.
//!
//! Runs against the in-memory session store and mock credential repository.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde_json::Value;
use sessionguard_auth::constants::{CSRF_HEADER, DEFAULT_SESSION_TTL};
use sessionguard_auth::error::LOGIN_FAILED_MESSAGE;
use sessionguard_auth::mocks::MockCredentialRepository;
use sessionguard_auth::stores::{MemoryAttemptStore, MemorySessionStore};
use sessionguard_auth::{LoginService, LoginThrottle, SessionStore, StoreBackend, ThrottleConfig};
use sessionguard_web::csrf::{UploadedFiles, require_csrf};
use sessionguard_web::gate::LOGIN_REQUIRED_MESSAGE;
use sessionguard_web::{AppState, CookieSettings, CsrfToken, SessionLayer, TrustProxy, build_router};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    sessions: MemorySessionStore,
    credentials: MockCredentialRepository,
}

fn test_app() -> TestApp {
    let sessions = MemorySessionStore::new(DEFAULT_SESSION_TTL);
    let credentials = MockCredentialRepository::new();
    credentials.insert(1, "alice", "s3cret").unwrap();

    let login = LoginService::new(
        credentials.clone(),
        LoginThrottle::new(MemoryAttemptStore::new(), ThrottleConfig::default()),
    );
    let state = AppState::new(sessions.clone(), login, StoreBackend::Memory);
    let router = build_router(state, CookieSettings::default(), TrustProxy(false));

    TestApp {
        router,
        sessions,
        credentials,
    }
}

/// `sid=...` pair from the response's `Set-Cookie`, if any.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("sid="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Open a session via `GET /login`, returning the cookie and CSRF token.
async fn open_session(app: &TestApp) -> (String, String) {
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("session cookie");
    let header_token = response
        .headers()
        .get(CSRF_HEADER)
        .expect("csrf header")
        .to_str()
        .unwrap()
        .to_string();
    let body = json_body(response).await;
    assert_eq!(body["csrf_token"], header_token.as_str());
    assert_eq!(body["authenticated"], false);

    (cookie, header_token)
}

fn login_form(cookie: &str, token: Option<&str>, password: &str) -> Request<Body> {
    let mut body = format!("username=alice&password={password}");
    if let Some(token) = token {
        body.push_str(&format!("&_csrf={token}"));
    }
    Request::post("/login")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, "text/html")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_anonymous_requests_store_nothing() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert_eq!(app.sessions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_post_without_token_is_forbidden() {
    let app = test_app();
    let (cookie, _token) = open_session(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(login_form(&cookie, None, "s3cret"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "CSRF_TOKEN_INVALID");
    assert_eq!(app.credentials.lookup_count(), 0);
}

#[tokio::test]
async fn test_post_with_wrong_token_is_forbidden() {
    let app = test_app();
    let (cookie, _token) = open_session(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(login_form(&cookie, Some("not-the-token"), "s3cret"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rotates_session_and_token() {
    let app = test_app();
    let (cookie, token) = open_session(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(login_form(&cookie, Some(&token), "s3cret"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/me");

    let new_cookie = session_cookie(&response).expect("regenerated cookie");
    assert_ne!(new_cookie, cookie);
    let new_token = response.headers()[CSRF_HEADER].to_str().unwrap().to_string();
    assert_ne!(new_token, token);

    // Legacy plaintext secret was upgraded on the way in.
    let stored = app.credentials.stored_secret("alice").unwrap().unwrap();
    assert!(stored.starts_with("$argon2"));

    // The pre-login token no longer passes.
    let stale = app
        .router
        .clone()
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, &new_cookie)
                .header(CSRF_HEADER, &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::FORBIDDEN);

    // The old session id is gone.
    let old = app
        .router
        .clone()
        .oneshot(
            Request::get("/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let me = app
        .router
        .clone()
        .oneshot(
            Request::get("/me")
                .header(header::COOKIE, &new_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(json_body(me).await["identity"], "alice");
}

#[tokio::test]
async fn test_json_login_returns_identity_and_token() {
    let app = test_app();
    let (cookie, token) = open_session(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .header(CSRF_HEADER, &token)
                .body(Body::from(r#"{"identity":"alice","secret":"s3cret"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["identity"]["identity"], "alice");
    assert_ne!(body["csrf_token"], token.as_str());
}

#[tokio::test]
async fn test_lockout_looks_like_wrong_password() {
    let app = test_app();
    let (cookie, token) = open_session(&app).await;

    let attempt = |password: &'static str| {
        Request::post("/login")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .header(CSRF_HEADER, &token)
            .body(Body::from(format!(
                r#"{{"identity":"alice","secret":"{password}"}}"#
            )))
            .unwrap()
    };

    for _ in 0..5 {
        let response = app.router.clone().oneshot(attempt("wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], LOGIN_FAILED_MESSAGE);
    }

    // Correct secret while locked: same status, same message, no lookup.
    let lookups = app.credentials.lookup_count();
    let response = app.router.clone().oneshot(attempt("s3cret")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], LOGIN_FAILED_MESSAGE);
    assert_eq!(app.credentials.lookup_count(), lookups);
}

#[tokio::test]
async fn test_failed_browser_login_flashes_error() {
    let app = test_app();
    let (cookie, token) = open_session(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(login_form(&cookie, Some(&token), "wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let page = app
        .router
        .clone()
        .oneshot(
            Request::get("/login")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(page).await;
    assert_eq!(body["messages"]["error"][0], LOGIN_FAILED_MESSAGE);
}

#[tokio::test]
async fn test_gate_redirects_browsers_and_rejects_api_callers() {
    let app = test_app();

    let browser = app
        .router
        .clone()
        .oneshot(
            Request::get("/me")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(browser.status(), StatusCode::SEE_OTHER);
    assert_eq!(browser.headers()[header::LOCATION], "/login");
    let cookie = session_cookie(&browser).expect("flash needs a session");

    let page = app
        .router
        .clone()
        .oneshot(
            Request::get("/login")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json_body(page).await["messages"]["warning"][0], LOGIN_REQUIRED_MESSAGE);

    let api = app
        .router
        .clone()
        .oneshot(Request::get("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let app = test_app();
    let (cookie, token) = open_session(&app).await;
    let login = app
        .router
        .clone()
        .oneshot(login_form(&cookie, Some(&token), "s3cret"))
        .await
        .unwrap();
    let cookie = session_cookie(&login).unwrap();
    let token = login.headers()[CSRF_HEADER].to_str().unwrap().to_string();
    assert_eq!(app.sessions.count().await.unwrap(), 1);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, &cookie)
                .header(CSRF_HEADER, &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(app.sessions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_upload_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("avatar.png");
    std::fs::write(&upload, b"not really a png").unwrap();

    let sessions = MemorySessionStore::new(DEFAULT_SESSION_TTL);
    let recorded = upload.clone();
    let router = Router::new()
        .route("/avatar", post(|| async { "stored" }))
        .route_layer(middleware::from_fn(require_csrf))
        .layer(middleware::from_fn(move |mut req: Request<Body>, next: Next| {
            let path = recorded.clone();
            async move {
                req.extensions_mut().insert(UploadedFiles(vec![path]));
                next.run(req).await
            }
        }))
        .layer(SessionLayer::new(sessions, CookieSettings::default()));

    let response = router
        .oneshot(
            Request::post("/avatar")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
                .body(Body::from("--x--"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!upload.exists());
}

fn multipart_upload(cookie: &str, token: &str) -> Request<Body> {
    let body = format!(
        "--XYZ\r\n\
         Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         PNGDATA\r\n\
         --XYZ\r\n\
         Content-Disposition: form-data; name=\"_csrf\"\r\n\r\n\
         {token}\r\n\
         --XYZ--\r\n"
    );
    Request::post("/avatar")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_multipart_form_token_is_accepted() {
    let sessions = MemorySessionStore::new(DEFAULT_SESSION_TTL);
    let router = Router::new()
        .route(
            "/avatar",
            get(|CsrfToken(token): CsrfToken| async move { token }).post(|body: String| async move {
                // The handler still sees the full upload.
                if body.contains("PNGDATA") { "stored" } else { "empty" }
            }),
        )
        .route_layer(middleware::from_fn(require_csrf))
        .layer(SessionLayer::new(sessions, CookieSettings::default()));

    let response = router
        .clone()
        .oneshot(Request::get("/avatar").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session_cookie(&response).expect("session cookie");
    let token = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();

    let response = router
        .clone()
        .oneshot(multipart_upload(&cookie, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"stored");

    let response = router
        .oneshot(multipart_upload(&cookie, "forged"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
