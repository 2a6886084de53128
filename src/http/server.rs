//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router: POST and OPTIONS on every path
//! - Wire up middleware (request ID, tracing)
//! - Serve on the bounded listener until shutdown

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::post,
    Router,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::response::preflight_response;
use crate::lifecycle::shutdown;
use crate::net::Listener;
use crate::observability::metrics;
use crate::relay::{RelayContext, RelayObserver, RelaySession};

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
    drain: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let context = RelayContext::new(Arc::clone(&config))?;
        Ok(Self::from_context(context))
    }

    /// Like [`HttpServer::new`] but reporting relay events to `observer`.
    pub fn with_observer(
        config: RelayConfig,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Self, reqwest::Error> {
        let context = RelayContext::with_observer(Arc::new(config), observer)?;
        Ok(Self::from_context(context))
    }

    fn from_context(context: RelayContext) -> Self {
        let config = Arc::clone(&context.config);
        let drain = context.drain.clone();
        Self {
            router: Self::build_router(context),
            config,
            drain,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(context: RelayContext) -> Router {
        let relay_routes = post(relay_handler).options(preflight_handler);
        Router::new()
            .route("/", relay_routes.clone())
            .route("/{*path}", relay_routes)
            .with_state(context)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router alone, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires. On shutdown the
    /// listener stops accepting and every live stream ends with a terminal
    /// frame, so draining never waits on an open upstream.
    pub async fn run(
        self,
        listener: Listener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.endpoint,
            "HTTP server starting"
        );

        let drain = self.drain.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown).await;
                tracing::info!("Draining live streams");
                drain.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// POST on any path: relay the body upstream and stream the answer back.
async fn relay_handler(State(context): State<RelayContext>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::debug!(
        request_id = %request_id,
        path = %request.uri().path(),
        "Relaying request"
    );

    RelaySession::new(request_id, Arc::clone(&context.observer))
        .run(&context, request)
        .await
}

/// OPTIONS on any path: CORS preflight, answered without touching upstream.
async fn preflight_handler() -> Response {
    metrics::record_request("preflight");
    preflight_response()
}
