pub mod health;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::auth::handlers as auth;
use crate::generation::handlers as generation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Identity
        .route("/signup", post(auth::signup))
        .route("/token", post(auth::login))
        .route("/users/me", get(auth::me))
        // Generation
        .route("/generate", post(generation::handle_generate))
        .with_state(state)
        .layer(cors)
}

/// Credentialed CORS for the configured origins. Methods and headers mirror
/// the preflight request, since wildcards are not allowed with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, Response, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::jwt::TokenKeys;
    use crate::config::Config;
    use crate::generation::graph::tests::ScriptedModel;
    use crate::generation::prompts::UNKNOWN_INTENT_OUTPUT;
    use crate::users::memory::InMemoryUserStore;

    struct TestApp {
        router: Router,
        users: Arc<InMemoryUserStore>,
        llm: Arc<ScriptedModel>,
    }

    fn test_app(replies: &[&str]) -> TestApp {
        test_app_with_model(ScriptedModel::new(replies))
    }

    fn test_app_with_model(model: ScriptedModel) -> TestApp {
        let users = Arc::new(InMemoryUserStore::default());
        let llm = Arc::new(model);
        let state = AppState {
            users: users.clone(),
            llm: llm.clone(),
            config: Config::for_tests(),
        };
        TestApp {
            router: build_router(state),
            users,
            llm,
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
        app.router.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn signup(app: &TestApp, email: &str, username: &str) -> Response<Body> {
        let body = json!({
            "email": email,
            "username": username,
            "password": "s3cret-password",
            "full_name": "Jane Doe"
        });
        send(app, json_request(Method::POST, "/signup", body, None)).await
    }

    async fn login(app: &TestApp, username: &str, password: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap();
        send(app, request).await
    }

    async fn signup_and_login(app: &TestApp, email: &str, username: &str) -> String {
        assert_eq!(signup(app, email, username).await.status(), StatusCode::OK);
        let response = login(app, username, "s3cret-password").await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let app = test_app(&[]);
        let root = body_json(send(&app, get_request("/", None)).await).await;
        assert!(root["message"].as_str().unwrap().contains("Welcome"));

        let health = body_json(send(&app, get_request("/health", None)).await).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["service"], "jobdraft-api");
    }

    #[tokio::test]
    async fn test_signup_returns_profile_without_password_material() {
        let app = test_app(&[]);
        let response = signup(&app, "Jane@Example.com ", "jane").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["id"].is_string());
        assert_eq!(body["email"], "jane@example.com");
        assert_eq!(body["username"], "jane");
        assert_eq!(body["full_name"], "Jane Doe");
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert!(keys.iter().all(|k| !k.contains("password")));

        let stored = app.users.all();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].hashed_password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_email_or_username_is_rejected() {
        let app = test_app(&[]);
        assert_eq!(signup(&app, "jane@example.com", "jane").await.status(), StatusCode::OK);

        let same_email = signup(&app, "jane@example.com", "other").await;
        assert_eq!(same_email.status(), StatusCode::BAD_REQUEST);
        let body = body_json(same_email).await;
        assert_eq!(body["error"]["message"], "Email already registered");

        let same_username = signup(&app, "other@example.com", "jane").await;
        assert_eq!(same_username.status(), StatusCode::BAD_REQUEST);
        let body = body_json(same_username).await;
        assert_eq!(body["error"]["message"], "Username already taken");

        assert_eq!(app.users.all().len(), 1);
    }

    #[tokio::test]
    async fn test_signup_validation_errors() {
        let app = test_app(&[]);
        let short_name = signup(&app, "jane@example.com", "jo").await;
        assert_eq!(short_name.status(), StatusCode::BAD_REQUEST);

        let bad_email = signup(&app, "not-an-email", "jane").await;
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let app = test_app(&[]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;

        let no_username = json!({ "email": "bob@example.com", "password": "s3cret-password" });
        let no_query = json!({ "prompt": "Write me a cover letter for Acme" });
        let form_without_password = Request::builder()
            .method(Method::POST)
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=jane"))
            .unwrap();

        for response in [
            send(&app, json_request(Method::POST, "/signup", no_username, None)).await,
            send(&app, json_request(Method::POST, "/generate", no_query, Some(&token))).await,
            send(&app, form_without_password).await,
        ] {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            assert!(body["error"]["message"].is_string());
        }
        assert_eq!(app.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_resolves_to_callers_profile() {
        let app = test_app(&[]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;
        signup_and_login(&app, "bob@example.com", "bob").await;

        let claims = TokenKeys::from_config(&Config::for_tests().jwt)
            .verify(&token)
            .unwrap();
        assert_eq!(claims.sub, "jane@example.com");

        let response = send(&app, get_request("/users/me", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "jane@example.com");
        assert_eq!(body["username"], "jane");
    }

    #[tokio::test]
    async fn test_login_with_bad_credentials_is_uniform_401() {
        let app = test_app(&[]);
        signup(&app, "jane@example.com", "jane").await;

        for response in [
            login(&app, "jane", "wrong-password").await,
            login(&app, "nobody", "s3cret-password").await,
        ] {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
            let body = body_json(response).await;
            assert_eq!(body["error"]["message"], "Could not validate credentials");
        }
    }

    #[tokio::test]
    async fn test_protected_routes_reject_bad_tokens() {
        let app = test_app(&[]);
        signup(&app, "jane@example.com", "jane").await;
        let keys = TokenKeys::from_config(&Config::for_tests().jwt);
        let ttl = keys.ttl.as_secs() as i64;
        let expired = keys
            .issue_at("jane@example.com", Utc::now().timestamp() - ttl - 1)
            .unwrap();

        for token in [None, Some("garbage"), Some(expired.as_str())] {
            let response = send(&app, get_request("/users/me", token)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let generate = json_request(
                Method::POST,
                "/generate",
                json!({ "query": "Write me a resume please" }),
                token,
            );
            assert_eq!(send(&app, generate).await.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(app.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_for_removed_user_is_rejected() {
        let app = test_app(&[]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;
        app.users.remove_by_email("jane@example.com");

        let response = send(&app, get_request("/users/me", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_generate_cover_letter() {
        let app = test_app(&["cover_letter", "Dear Hiring Manager,"]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;
        let query = "Write a cover letter for the Acme Rust role";

        let response = send(
            &app,
            json_request(Method::POST, "/generate", json!({ "query": query }), Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["query"], query);
        assert_eq!(body["output"], "Dear Hiring Manager,");
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_generate_unknown_intent_is_still_success() {
        let app = test_app(&["no idea"]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/generate",
                json!({ "query": "Tell me something about the weather" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["output"], UNKNOWN_INTENT_OUTPUT);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_generate_resume_missing_sections_returns_gate_reply() {
        let reply = "Missing: Education. Please provide it.";
        let app = test_app(&["resume", reply]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/generate",
                json!({ "query": "Resume for Acme. Skills: Rust. Email: j@x.io" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["output"], reply);
    }

    #[tokio::test]
    async fn test_generate_rejects_short_query() {
        let app = test_app(&[]);
        let token = signup_and_login(&app, "jane@example.com", "jane").await;

        let response = send(
            &app,
            json_request(Method::POST, "/generate", json!({ "query": "resume" }), Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_surfaces_completion_failure_as_500() {
        let app = test_app_with_model(ScriptedModel::failing_after(&[], 502));
        let token = signup_and_login(&app, "jane@example.com", "jane").await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/generate",
                json!({ "query": "Write a cover letter for Acme" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Generation failed"));
        assert!(message.contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let app = test_app(&[]);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/generate")
            .header("Origin", "http://localhost:5173")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "authorization,content-type")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
    }
}
