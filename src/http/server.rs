//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum stack around a single dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Dispatch requests to the talk router, then static files, then 404
//! - Release pending long polls on shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::handlers::{talk_routes, AppContext, TalkRouter};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response::not_found_page;
use crate::observability::metrics;
use crate::routing::{PatternError, Resolution};
use crate::store::TalkStore;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<AppContext>,
    pub routes: Arc<TalkRouter>,
    pub static_root: Arc<PathBuf>,
}

/// HTTP server for the talk API.
pub struct TalkServer {
    router: Router,
    config: ServerConfig,
    store: Arc<TalkStore>,
}

impl TalkServer {
    /// Create a new HTTP server serving `store`.
    pub fn new(config: ServerConfig, store: Arc<TalkStore>) -> Result<Self, PatternError> {
        let state = AppState {
            context: Arc::new(AppContext::new(store.clone(), &config)),
            routes: Arc::new(talk_routes()?),
            static_root: Arc::new(config.static_files.root.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            store,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered service, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let store = self.store.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                // Suspended long polls would otherwise hold the drain open.
                let released = store.release_waiters();
                tracing::info!(released, "Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Route through the talk API, falling through to static files.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match state.routes.resolve(state.context.clone(), request).await {
        Resolution::Handled(Ok(reply)) => reply.into_response(),
        Resolution::Handled(Err(e)) => {
            if e.status().is_server_error() {
                tracing::error!(request_id = %id, method = %method, path = %path, error = %e, "Handler failed");
            } else {
                tracing::debug!(request_id = %id, method = %method, path = %path, error = %e, "Request rejected");
            }
            e.into_response()
        }
        Resolution::Unhandled(request) => serve_static(&state.static_root, request).await,
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn not_found(_request: Request<Body>) -> Result<Response, Infallible> {
    Ok(not_found_page())
}

/// Serve a file under `root`, or the 404 page.
async fn serve_static(root: &Path, request: Request<Body>) -> Response {
    let files = ServeDir::new(root)
        .call_fallback_on_method_not_allowed(true)
        .fallback(tower::service_fn(not_found));

    match files.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
