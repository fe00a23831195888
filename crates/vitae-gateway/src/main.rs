//! Vitae Gateway: onboarding interview, portfolio chat and voice over HTTP.

mod error;
mod handlers;
mod state;

use std::time::Instant;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Method, Request},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitae_core::{GatewayConfig, Secrets};

use crate::handlers::{onboarding, portfolio};
use crate::state::AppState;

/// Voice samples and photos can be a few megabytes.
const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::load()?;
    let secrets = Secrets::from_env();
    let state = AppState::from_config(&config, &secrets)?;

    let blob_dir = Some(config.blob_dir.as_str()).filter(|d| !d.trim().is_empty());
    let app = build_app(state, blob_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        bind = %config.bind_addr,
        version = vitae_core::version(),
        "[VITAE] Gateway listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_app(state: AppState, blob_dir: Option<&str>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/chat", post(onboarding::chat))
        .route("/api/onboarding/voice", post(onboarding::voice))
        .route("/api/onboarding/photo", post(onboarding::photo))
        .route("/api/onboarding/generate-prompt", post(onboarding::generate_prompt))
        .route("/api/onboarding/create-portfolio", post(onboarding::create))
        .route("/api/portfolio/:slug", get(portfolio::show))
        .route("/api/portfolio/:slug/chat", post(portfolio::chat))
        .route("/api/portfolio/:slug/speak", post(portfolio::speak))
        .route("/api/portfolio/:slug/token", get(portfolio::token))
        .with_state(state);

    if let Some(dir) = blob_dir {
        app = app.nest_service("/blobs", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(cors)
        .layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "[VITAE] Request served"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use vitae_core::{
        InterviewSpec, PlaceholderBlobStore, PlaceholderGenerator, PlaceholderVoice,
        PortfolioStore,
    };

    const BOUNDARY: &str = "VITAEBOUNDARY";

    struct Harness {
        app: Router,
        store: PortfolioStore,
        _dir: tempfile::TempDir,
    }

    fn harness(generator: PlaceholderGenerator, voice: PlaceholderVoice, agent: Option<&str>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = PortfolioStore::open(Some(dir.path())).unwrap();
        let state = AppState::new(
            InterviewSpec::default(),
            Arc::new(generator),
            Arc::new(voice),
            Arc::new(PlaceholderBlobStore),
            store.clone(),
            agent.map(str::to_string),
        );
        Harness {
            app: build_app(state, None),
            store,
            _dir: dir,
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, parts: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(format!("{}--{}--\r\n", parts, BOUNDARY)))
            .unwrap()
    }

    fn file_part(file_name: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n{}\r\n",
            BOUNDARY, file_name, content_type, data
        )
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn onboarding_chat_opens_without_model() {
        let h = harness(PlaceholderGenerator::failing(), PlaceholderVoice::new(), None);
        let req = json_request("POST", "/api/onboarding/chat", serde_json::json!({ "history": [] }));
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["message"], InterviewSpec::default().opening_message);
        assert_eq!(json["progress"], 0);
        assert_eq!(json["is_complete"], false);
        assert!(json["extracted_data"].is_null());
    }

    #[tokio::test]
    async fn onboarding_chat_accepts_null_and_blank_turns() {
        let h = harness(PlaceholderGenerator::failing(), PlaceholderVoice::new(), None);
        let req = json_request(
            "POST",
            "/api/onboarding/chat",
            serde_json::json!({
                "history": [
                    { "role": "assistant", "content": "Ciao! Sono Vitae." },
                    { "role": "user", "content": null },
                    { "role": "assistant", "content": "   " }
                ]
            }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["message"], InterviewSpec::default().opening_message);
    }

    #[tokio::test]
    async fn onboarding_chat_apologizes_when_model_is_down() {
        let h = harness(PlaceholderGenerator::failing(), PlaceholderVoice::new(), None);
        let req = json_request(
            "POST",
            "/api/onboarding/chat",
            serde_json::json!({ "message": "Sono un architetto", "history": [] }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(res).await;
        assert_eq!(json["message"], onboarding::CHAT_APOLOGY);
    }

    #[tokio::test]
    async fn onboarding_chat_returns_parsed_reply() {
        let h = harness(
            PlaceholderGenerator::with_replies([
                "Perfetto, andiamo avanti!\n```json\n{\"message\":\"\",\"progress\":15,\"current_area\":\"IDENTITÀ PROFESSIONALE\",\"is_complete\":false}\n```",
            ]),
            PlaceholderVoice::new(),
            None,
        );
        let req = json_request(
            "POST",
            "/api/onboarding/chat",
            serde_json::json!({
                "message": "Faccio il cuoco",
                "history": [{ "role": "assistant", "content": "Ciao! Sono Vitae. Di cosa ti occupi?" }]
            }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["message"], "Perfetto, andiamo avanti!");
        assert_eq!(json["progress"], 15);
        assert_eq!(json["completed_topics"][0], "IDENTITÀ PROFESSIONALE");
        assert_eq!(json["state"]["progress"], 15);
    }

    #[tokio::test]
    async fn voice_upload_requires_file() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let parts = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nGiulia\r\n",
            BOUNDARY
        );
        let res = h
            .app
            .oneshot(multipart_request("/api/onboarding/voice", &parts))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn voice_clone_failure_falls_back_to_default() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::failing_clone(), None);
        let parts = file_part("voice_sample.webm", "audio/webm", "RIFFdata");
        let res = h
            .app
            .oneshot(multipart_request("/api/onboarding/voice", &parts))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["voice_id"], vitae_core::voice::DEFAULT_CLONE_VOICE_ID);
        assert!(json["warning"].is_string());
    }

    #[tokio::test]
    async fn photo_upload_without_storage_returns_mock_avatar() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let parts = file_part("me.png", "image/png", "png");
        let res = h
            .app
            .oneshot(multipart_request("/api/onboarding/photo", &parts))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert!(json["url"].as_str().unwrap().starts_with("https://avatar.vercel.sh/"));
        assert!(json["warning"].is_string());
    }

    #[tokio::test]
    async fn generate_prompt_returns_draft() {
        let h = harness(
            PlaceholderGenerator::with_replies([r#"{"name":"Luca","system_prompt":"Sei Luca."}"#]),
            PlaceholderVoice::new(),
            None,
        );
        let req = json_request(
            "POST",
            "/api/onboarding/generate-prompt",
            serde_json::json!({ "history": [{ "role": "user", "content": "Mi chiamo Luca" }] }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["name"], "Luca");
        assert_eq!(json["system_prompt"], "Sei Luca.");
    }

    #[tokio::test]
    async fn created_portfolio_is_served_without_prompt() {
        let h = harness(
            PlaceholderGenerator::with_replies(["Ciao, sono Anna."]),
            PlaceholderVoice::new(),
            None,
        );
        let req = json_request(
            "POST",
            "/api/onboarding/create-portfolio",
            serde_json::json!({
                "name": "Anna",
                "jobTitle": "Data scientist",
                "system_prompt": "Sei Anna.",
                "history": []
            }),
        );
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let created = body_json(res).await;
        assert_eq!(created["success"], true);
        let slug = created["slug"].as_str().unwrap().to_string();
        assert!(h.store.get_portfolio(&slug).unwrap().is_some());

        let req = Request::builder()
            .uri(format!("/api/portfolio/{}", slug))
            .body(Body::empty())
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["name"], "Anna");
        assert_eq!(json["jobTitle"], "Data scientist");
        assert_eq!(json["voice_id"], "default");
        assert!(json.get("system_prompt").is_none());
        assert!(json.get("conversation_history").is_none());

        let req = json_request(
            "POST",
            &format!("/api/portfolio/{}/chat", slug),
            serde_json::json!({ "message": "Chi sei?", "history": [] }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["message"], "Ciao, sono Anna.");
    }

    #[tokio::test]
    async fn unknown_portfolio_is_404() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let req = json_request(
            "POST",
            "/api/portfolio/nope/chat",
            serde_json::json!({ "message": "ciao" }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"], "Portfolio not found");
    }

    #[tokio::test]
    async fn speak_returns_mpeg() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let req = json_request(
            "POST",
            "/api/portfolio/any/speak",
            serde_json::json!({ "text": "Ciao!", "voice_id": "default" }),
        );
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/mpeg");
    }

    #[tokio::test]
    async fn token_requires_agent_configuration() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), None);
        let record = vitae_core::create_portfolio(
            &h.store,
            vitae_core::NewPortfolio {
                name: "Sara".into(),
                system_prompt: "Sei Sara.".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let req = Request::builder()
            .uri(format!("/api/portfolio/{}/token", record.slug))
            .body(Body::empty())
            .unwrap();
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["error"], "Server configuration error");
    }

    #[tokio::test]
    async fn token_returns_signed_url() {
        let h = harness(PlaceholderGenerator::new(), PlaceholderVoice::new(), Some("agent-1"));
        let record = vitae_core::create_portfolio(
            &h.store,
            vitae_core::NewPortfolio {
                name: "Sara".into(),
                system_prompt: "Sei Sara.".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let req = Request::builder()
            .uri(format!("/api/portfolio/{}/token", record.slug))
            .body(Body::empty())
            .unwrap();
        let res = h.app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert!(json["signedUrl"].as_str().unwrap().contains("agent-1"));
    }
}
