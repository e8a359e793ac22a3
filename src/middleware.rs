//! axum middleware that decorates responses of deprecated routes.
//!
//! Two forms are provided:
//!
//! - [`annotate_routes`] wraps a whole router and annotates responses
//!   whose path and method match a configured [`DeprecatedRoute`].
//! - [`deprecated`] is attached to individual routes with `route_layer`.
//!
//! Both run the downstream handler first and only then touch the headers, so
//! the handler's status and body are always returned unchanged.

use crate::config::{self, DeprecatedRoute, DeprecationConfig, ServiceConfig};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::ConfigError;
use crate::headers::annotate;
use crate::metrics::DeprecationMetrics;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

/// Shared state for [`annotate_routes`].
pub struct DeprecationLayerState {
    routes: Vec<DeprecatedRoute>,
    sink: Arc<dyn DiagnosticSink>,
    metrics: Option<DeprecationMetrics>,
    log_annotations: bool,
}

impl DeprecationLayerState {
    pub fn new(routes: Vec<DeprecatedRoute>) -> Self {
        Self {
            routes,
            sink: Arc::new(TracingSink),
            metrics: None,
            log_annotations: true,
        }
    }

    /// State for the routes and settings of a loaded service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut state = Self::new(config.routes.clone());
        state.log_annotations = config.settings.log_annotations;
        state
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<DeprecationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Find the first deprecated route matching a path and method.
    pub fn find_route(&self, path: &str, method: &str) -> Option<&DeprecatedRoute> {
        config::find_route(&self.routes, path, method)
    }

    fn decorate(&self, route: &DeprecatedRoute, response: &mut Response) {
        let annotation = annotate(response.headers(), &route.deprecation, self.sink.as_ref());
        *response.headers_mut() = annotation.headers;

        if let Some(metrics) = &self.metrics {
            metrics.record_annotation(&route.id);
            if let Some(reason) = annotation.sunset.rejection_reason() {
                metrics.record_sunset_rejected(&route.id, reason);
            }
        }

        if self.log_annotations {
            debug!(
                route_id = %route.id,
                status = response.status().as_u16(),
                sunset = ?annotation.sunset,
                "Annotated deprecated route response"
            );
        }
    }
}

/// Router-wide middleware driven by the configured route table.
pub async fn annotate_routes(
    State(state): State<Arc<DeprecationLayerState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();

    let mut response = next.run(request).await;

    if let Some(route) = state.find_route(&path, method.as_str()) {
        state.decorate(route, &mut response);
    }

    response
}

/// Deprecation metadata for a single route, used with [`deprecated`].
#[derive(Clone)]
pub struct RouteDeprecation {
    config: DeprecationConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl RouteDeprecation {
    pub fn new(config: DeprecationConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Build from positional arguments: `date,docUrl,sunset`.
    pub fn from_args(args: &str) -> Result<Self, ConfigError> {
        DeprecationConfig::from_args(args).map(Self::new)
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Per-route middleware.
///
/// ```ignore
/// let rule = Arc::new(RouteDeprecation::from_args("2024-06-01T00:00:00Z")?);
/// let app = Router::new()
///     .route("/v1/users", get(list_users))
///     .route_layer(axum::middleware::from_fn_with_state(rule, deprecated));
/// ```
pub async fn deprecated(
    State(rule): State<Arc<RouteDeprecation>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let annotation = annotate(response.headers(), &rule.config, rule.sink.as_ref());
    *response.headers_mut() = annotation.headers;
    response
}
