//! # Krystal HTTP API Module
//!
//! HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Network size and density
//! - `POST /network` - Replace the network and analyse it
//! - `GET /analysis` - Full analysis of the current network
//! - `GET /influence/{id}` - Influence score of one entity
//! - `POST /paths` - Connection paths between two entities
//! - `POST /neighbors` - Neighbours of an entity
//! - `GET /export?format=json|canonical` - Export the network
//! - `GET /hash` - BLAKE3 hash of the canonical export
//! - `POST /investigate` - Build a network from a news query
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `KRYSTAL_CORS_ORIGINS`: Comma-separated allowed origins, or "*" for all (default: localhost only)
//! - `KRYSTAL_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `KRYSTAL_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use middleware::{RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env};
pub use handlers::{
    analysis_handler, export_handler, hash_handler, health_handler, influence_handler,
    investigate_handler, neighbors_handler, network_handler, paths_handler, status_handler,
};
pub use types::{
    ExportQuery, ExportResponse, HashResponse, HealthResponse, InfluenceResponse,
    InvestigateRequest, InvestigateResponse, MAX_QUERY_LENGTH, NeighborsRequest,
    NeighborsResponse, NetworkRequest, NetworkResponse, PathsRequest, PathsResponse,
    StatusResponse,
};

use crate::sources::DataSources;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use krystal_core::{KrystalError, NetworkBackend, NetworkSnapshot, PowerMapper};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Environment variable holding the allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "KRYSTAL_CORS_ORIGINS";

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The analysed network.
    pub mapper: Arc<RwLock<PowerMapper>>,
    /// External data sources used by `/investigate`.
    pub sources: DataSources,
    /// Where replaced networks are persisted. `None` keeps them in memory.
    pub backend: Option<Arc<Mutex<NetworkBackend>>>,
}

impl AppState {
    #[must_use]
    pub fn new(mapper: PowerMapper, sources: DataSources) -> Self {
        Self {
            mapper: Arc::new(RwLock::new(mapper)),
            sources,
            backend: None,
        }
    }

    /// Persist every replaced network to `backend`.
    #[must_use]
    pub fn with_backend(mut self, backend: NetworkBackend) -> Self {
        self.backend = Some(Arc::new(Mutex::new(backend)));
        self
    }

    /// Apply `change` to the network and persist the result.
    ///
    /// The write lock is held until the save completes, so the stored network
    /// always matches the in-memory one. If either step fails, the previous
    /// network is restored.
    pub async fn commit<T>(
        &self,
        change: impl FnOnce(&mut PowerMapper) -> Result<T, KrystalError>,
    ) -> Result<T, KrystalError> {
        let mut mapper = self.mapper.write().await;
        let previous = mapper.clone();

        let value = match change(&mut *mapper) {
            Ok(value) => value,
            Err(e) => {
                *mapper = previous;
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&mapper.snapshot()).await {
            tracing::warn!("Persist failed, previous network restored: {}", e);
            *mapper = previous;
            return Err(e);
        }
        Ok(value)
    }

    /// Save `snapshot` to the backend, if there is one.
    async fn persist(&self, snapshot: &NetworkSnapshot) -> Result<(), KrystalError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let mut backend = backend.lock().await;
        backend.save(snapshot)?;
        tracing::debug!(
            backend = backend.name(),
            entities = snapshot.entities.len(),
            relationships = snapshot.relationships.len(),
            "Network persisted"
        );
        Ok(())
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Origins allowed when `KRYSTAL_CORS_ORIGINS` names none: a local dashboard.
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Origins named by a `KRYSTAL_CORS_ORIGINS` value. `None` allows any origin.
fn cors_origins(value: Option<&str>) -> Option<Vec<HeaderValue>> {
    let list = value.unwrap_or_default().trim();
    if list == "*" {
        return None;
    }

    let origins: Vec<HeaderValue> = list
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| {
            o.parse::<HeaderValue>()
                .inspect_err(|e| tracing::warn!("CORS: ignoring origin '{}': {}", o, e))
                .ok()
        })
        .collect();

    if origins.is_empty() {
        Some(
            DEFAULT_CORS_ORIGINS
                .iter()
                .map(|o| HeaderValue::from_static(o))
                .collect(),
        )
    } else {
        Some(origins)
    }
}

/// JSON reads and posts, optionally with a bearer key.
fn build_cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match cors_origins(std::env::var(CORS_ORIGINS_ENV).ok().as_deref()) {
        Some(origins) => layer.allow_origin(origins),
        None => {
            tracing::warn!("CORS: {}=* allows every origin", CORS_ORIGINS_ENV);
            layer.allow_origin(AllowOrigin::any())
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit (2 MiB)
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible. \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/network", post(handlers::network_handler))
        .route("/analysis", get(handlers::analysis_handler))
        .route("/influence/{id}", get(handlers::influence_handler))
        .route("/paths", post(handlers::paths_handler))
        .route("/neighbors", post(handlers::neighbors_handler))
        .route("/export", get(handlers::export_handler))
        .route("/hash", get(handlers::hash_handler))
        .route("/investigate", post(handlers::investigate_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), KrystalError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KrystalError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Krystal HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| KrystalError::IoError(format!("Server error: {}", e)))
}
