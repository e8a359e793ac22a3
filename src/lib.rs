//! Deprecation Middleware
//!
//! Annotates HTTP responses of deprecated routes with standard deprecation
//! metadata.
//!
//! # Features
//!
//! - **Deprecation Header**: RFC 9745, `true`, `@<epoch>` or an HTTP-date
//! - **Sunset Header**: RFC 8594, validated against the deprecation date
//! - **Link Header**: RFC 8288 `rel="deprecation"` documentation link
//! - **axum Middleware**: router-wide route table or per-route layer
//! - **Usage Tracking**: Prometheus counters for annotated responses
//!
//! # Example Configuration
//!
//! ```yaml
//! routes:
//!   - id: legacy-users
//!     path: /api/v1/users
//!     methods: [GET]
//!     deprecation: "2024-06-01T00:00:00Z,https://docs.example.com/deprecation,2024-12-01T00:00:00Z"
//!   - id: legacy-orders
//!     path: /api/v1/orders/*
//!     deprecation:
//!       doc_url: https://docs.example.com/orders
//!       sunset: "2025-06-01"
//! ```

pub mod config;
pub mod dates;
pub mod diagnostics;
pub mod error;
pub mod headers;
pub mod metrics;
pub mod middleware;

pub use config::{DeprecatedRoute, DeprecationConfig, ServiceConfig};
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use error::ConfigError;
pub use headers::{annotate, Annotation, DeprecationHeaders, SunsetOutcome};
pub use middleware::{annotate_routes, deprecated, DeprecationLayerState, RouteDeprecation};
