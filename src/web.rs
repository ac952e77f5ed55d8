use crate::config::{ConfigError, ESTIMATED_COST_PER_QUIZ, Settings};
use crate::generator::QuizGenerator;
use crate::provider::ProviderError;
use crate::quiz::{QuizRequest, QuizResponse};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
const SERVICE_NAME: &str = "Spot Quiz API";

pub struct AppState {
    pub settings: Settings,
    pub generator: QuizGenerator,
}

impl AppState {
    pub fn new(settings: Settings, generator: QuizGenerator) -> Self {
        Self {
            settings,
            generator,
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Config(ConfigError),
    Provider(ProviderError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Config(err) => write!(f, "config error: {err}"),
            WebError::Provider(err) => write!(f, "provider setup error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<ConfigError> for WebError {
    fn from(value: ConfigError) -> Self {
        WebError::Config(value)
    }
}

impl From<ProviderError> for WebError {
    fn from(value: ProviderError) -> Self {
        WebError::Provider(value)
    }
}

pub async fn serve(settings: Settings) -> Result<(), WebError> {
    let addr = settings.listen_addr()?;
    let generator = QuizGenerator::from_settings(&settings)?;
    let state = Arc::new(AppState::new(settings, generator));
    let router = build_router(state.clone());
    info!(
        %addr,
        model = %state.settings.sampling.model,
        provider = state.generator.has_provider(),
        origins = state.settings.allowed_origins.len(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.settings.allowed_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/quizzes/generate-ai", post(generate_ai_quiz))
        .route("/api/v1/stats/usage", get(usage_stats))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

/// Credentialed CORS for the configured origins; methods and headers are
/// mirrored from the preflight since wildcards are not allowed with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn root(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "message": format!("{SERVICE_NAME} is running"),
        "provider_configured": state.generator.has_provider(),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "provider_available": state.generator.has_provider(),
    }))
}

async fn generate_ai_quiz(
    State(state): State<SharedState>,
    Json(request): Json<QuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    if request.spot_name.trim().is_empty() {
        return Err(ApiError::unprocessable("`spot_name` must not be empty"));
    }
    let generated = state.generator.generate(&request).await;
    Ok(Json(QuizResponse::new(generated.quiz, generated.source)))
}

async fn usage_stats(State(state): State<SharedState>) -> impl IntoResponse {
    let sampling = state.generator.sampling();
    Json(json!({
        "model": sampling.model,
        "estimated_cost_per_quiz": ESTIMATED_COST_PER_QUIZ,
        "max_tokens": sampling.max_tokens,
        "temperature": sampling.temperature,
        "api_configured": state.settings.has_credential(),
    }))
}
