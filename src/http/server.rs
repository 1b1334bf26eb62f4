//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the terminal handlers for the configured mode (API, proxy or
//!   static trees; never both of the last two)
//! - Wire up middleware (headers, request ID, tracing, security gate,
//!   timeout, body limit)
//! - Dispatch each request through the route table
//! - Serve with graceful shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! hardening headers → set request id → trace → propagate request id
//!     → security gate → timeout → body limit → dispatch
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, Request},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{api_router, ApiState, DatabaseProbe, PostgresProbe};
use crate::assets::StaticTrees;
use crate::config::{EdgeConfig, RoutingMode};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::EdgeRejection;
use crate::lifecycle::{shutdown, Shutdown};
use crate::observability::metrics;
use crate::proxy::{DevProxy, ProxyError};
use crate::routing::{Classification, RouteTable, RouteTableError};
use crate::security::rate_limit::run_sweeper;
use crate::security::{
    harden_headers_middleware, security_gate_middleware, HardeningHeaders, RateLimiters,
    SecurityGate,
};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid route table: {0}")]
    RouteTable(#[from] RouteTableError),

    #[error("invalid upstream: {0}")]
    Proxy(#[from] ProxyError),

    #[error("invalid header value in security configuration: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub mode: RoutingMode,
    pub table: Arc<RouteTable>,
    pub api: Router,
    pub proxy: Option<Arc<DevProxy>>,
    pub assets: Option<Arc<StaticTrees>>,
}

/// The edge router: one listener, every request classified exactly once.
pub struct EdgeServer {
    router: Router,
    config: Arc<EdgeConfig>,
    limiters: RateLimiters,
    shutdown: Shutdown,
}

impl EdgeServer {
    /// Build the server with the Postgres probe for `config.database`.
    pub fn new(config: EdgeConfig, shutdown: Shutdown) -> Result<Self, ServerError> {
        let database = Arc::new(PostgresProbe::from_config(&config.database));
        Self::with_database(config, database, shutdown)
    }

    pub fn with_database(
        config: EdgeConfig,
        database: Arc<dyn DatabaseProbe>,
        shutdown: Shutdown,
    ) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let table = Arc::new(RouteTable::for_config(&config)?);

        let api = api_router(
            &config.api,
            ApiState {
                mode: config.mode,
                database,
            },
        );

        let (proxy, assets) = match config.mode {
            RoutingMode::Development => (
                Some(Arc::new(DevProxy::from_config(&config, shutdown.clone())?)),
                None,
            ),
            RoutingMode::Production => (None, Some(Arc::new(StaticTrees::from_config(&config.assets)))),
        };

        let state = AppState {
            mode: config.mode,
            table,
            api,
            proxy,
            assets,
        };

        let limiters = RateLimiters::from_config(&config);
        let gate = Arc::new(SecurityGate::from_config(&config, &limiters));
        let headers = Arc::new(HardeningHeaders::from_config(&config.security)?);

        let router = Self::build_router(&config, state, gate, headers);
        Ok(Self {
            router,
            config,
            limiters,
            shutdown,
        })
    }

    #[allow(deprecated)]
    fn build_router(
        config: &EdgeConfig,
        state: AppState,
        gate: Arc<SecurityGate>,
        headers: Arc<HardeningHeaders>,
    ) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(gate, security_gate_middleware))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(middleware::from_fn_with_state(headers, harden_headers_middleware))
    }

    /// The assembled router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Accept connections until the shutdown signal fires, then drain.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.config.mode,
            "Edge router listening"
        );

        if self.config.rate_limit.enabled {
            tokio::spawn(run_sweeper(
                self.limiters.all(),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                self.shutdown.subscribe(),
            ));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(self.shutdown.subscribe()))
            .await?;

        tracing::info!("Edge router stopped");
        Ok(())
    }
}

/// Classify the request and hand it to exactly one terminal handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let classification = state.table.classify(&path);

    tracing::debug!(
        request_id = %request_id(&request),
        method = %method,
        path = %path,
        classification = classification.label(),
        "Dispatching request"
    );

    let response = match classification {
        Classification::Api => match state.api.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        },
        Classification::Proxied(bundle) => match &state.proxy {
            Some(proxy) => proxy.forward(bundle, request).await,
            None => unrouted(state.mode, &path),
        },
        Classification::StaticServed(bundle) => match &state.assets {
            Some(assets) => assets.serve(bundle, request).await,
            None => unrouted(state.mode, &path),
        },
        Classification::Fallback => unrouted(state.mode, &path),
    };

    metrics::record_request(classification.label(), method.as_str(), response.status().as_u16(), start);
    response
}

fn unrouted(mode: RoutingMode, path: &str) -> Response {
    if mode.is_production() {
        tracing::error!(path = %path, "Request matched no route; the residual entry should catch every path");
    } else {
        tracing::warn!(path = %path, "Request matched no route");
    }
    EdgeRejection::Unrouted {
        path: path.to_string(),
    }
    .into_response()
}
