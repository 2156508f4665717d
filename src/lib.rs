use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod collection;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

pub mod routes;
use routes::{resources, system};

// --- Public Re-exports ---

pub use collection::{Collection, Record};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Generates the OpenAPI document served at `/api-docs/openapi.json`. The collection
/// routes are generic over the record type and are described through their schemas only.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::server_status, handlers::register_user, handlers::login_user,
        handlers::list_users, handlers::get_user
    ),
    components(
        schemas(
            models::ClothingItem, models::Testimonial, models::Comment, models::UserView,
            models::RegisterRequest, models::LoginRequest, models::TokenResponse,
            models::CreatedResponse, models::DeleteOutcome, models::ServerStatus,
        )
    ),
    tags(
        (name = "winter-clothes", description = "Winter clothes donation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration. The repository handle is
/// opened once in `main` and injected here; every handler reaches it through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Document store shared by the credential store and every collection.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl<T: Record> FromRef<AppState> for Collection<T> {
    fn from_ref(app_state: &AppState) -> Collection<T> {
        Collection::new(app_state.repo.clone())
    }
}

/// create_router
///
/// Assembles the routing structure, applies the observability and CORS layers, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let mut api = Router::new()
        .merge(routes::auth::auth_routes())
        .merge(resources::clothing_routes());
    if state.config.community_routes {
        api = api.merge(resources::community_routes());
    }

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(system::system_routes())
        .nest("/api/v1", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Generates a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, uri and the `x-request-id` assigned above,
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
