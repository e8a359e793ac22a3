//! Configuration for deprecated routes.
//!
//! A route's deprecation metadata is either the positional argument string
//! used when registering the middleware (`"date,docUrl,sunset"`) or the same
//! three fields spelled out by name.

use crate::dates::{parse_calendar, DeprecationDate};
use crate::error::ConfigError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Middleware name accepted in front of positional arguments.
const MIDDLEWARE_NAME: &str = "deprecated";

const DEFAULT_METRICS_PORT: u16 = 9090;

/// Deprecation metadata attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeprecationSource")]
pub struct DeprecationConfig {
    /// Deprecation date: Unix epoch seconds or a calendar date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Documentation URL advertised with `rel="deprecation"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,

    /// Sunset date (calendar date only, RFC 8594)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
}

impl DeprecationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_doc_url(mut self, doc_url: impl Into<String>) -> Self {
        self.doc_url = Some(doc_url.into());
        self
    }

    pub fn with_sunset(mut self, sunset: impl Into<String>) -> Self {
        self.sunset = Some(sunset.into());
        self
    }

    /// Parse positional middleware arguments: `date,docUrl,sunset`.
    ///
    /// Every position is optional and may be left empty. A leading
    /// `deprecated:` or `deprecated,` is ignored, and so is one extra empty
    /// leading position (`",,docUrl,sunset"`). Surrounding whitespace is
    /// dropped from the two dates; the documentation URL is kept verbatim.
    pub fn from_args(args: &str) -> Result<Self, ConfigError> {
        let stripped = strip_middleware_name(args);
        let mut parts: Vec<&str> = stripped.split(',').collect();

        if parts.len() == 4 && parts[0].trim().is_empty() {
            parts.remove(0);
        }
        if parts.len() > 3 {
            return Err(ConfigError::TooManyArguments {
                args: args.to_string(),
                count: parts.len(),
            });
        }

        let mut parts = parts.into_iter();
        Ok(Self {
            date: parts.next().and_then(|date| non_empty(date.trim())),
            doc_url: parts.next().and_then(non_empty),
            sunset: parts.next().and_then(|sunset| non_empty(sunset.trim())),
        })
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref().filter(|s| !s.is_empty())
    }

    pub fn doc_url(&self) -> Option<&str> {
        self.doc_url.as_deref().filter(|s| !s.is_empty())
    }

    pub fn sunset(&self) -> Option<&str> {
        self.sunset.as_deref().filter(|s| !s.is_empty())
    }

    /// Log schedule problems that will make the Sunset header disappear at runtime.
    fn check_schedule(&self, route_id: &str) {
        let Some(sunset) = self.sunset() else {
            return;
        };

        let Some(sunset_at) = parse_calendar(sunset) else {
            warn!(
                route_id = %route_id,
                sunset = %sunset,
                "Sunset date cannot be parsed; Sunset header will be omitted"
            );
            return;
        };

        if let Some(deprecated_at) = DeprecationDate::classify(self.date()).reference() {
            if sunset_at < deprecated_at {
                warn!(
                    route_id = %route_id,
                    sunset = %sunset,
                    "Sunset date is before the deprecation date; Sunset header will be omitted"
                );
            }
        }

        if sunset_at < Utc::now() {
            warn!(
                route_id = %route_id,
                sunset = %sunset,
                "Sunset date is in the past"
            );
        }
    }
}

fn strip_middleware_name(args: &str) -> &str {
    if args.trim() == MIDDLEWARE_NAME {
        return "";
    }
    args.trim_start()
        .strip_prefix(MIDDLEWARE_NAME)
        .and_then(|rest| rest.strip_prefix(':').or_else(|| rest.strip_prefix(',')))
        .unwrap_or(args)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Wire forms accepted for [`DeprecationConfig`].
#[derive(Deserialize)]
#[serde(untagged)]
enum DeprecationSource {
    Args(Scalar),
    Fields(DeprecationFields),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeprecationFields {
    #[serde(default)]
    date: Option<Scalar>,
    #[serde(default)]
    doc_url: Option<String>,
    #[serde(default)]
    sunset: Option<Scalar>,
}

/// A YAML scalar read as text; unquoted epochs arrive as integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Signed(n) => n.to_string(),
            Scalar::Unsigned(n) => n.to_string(),
        }
    }
}

impl TryFrom<DeprecationSource> for DeprecationConfig {
    type Error = ConfigError;

    fn try_from(source: DeprecationSource) -> Result<Self, Self::Error> {
        match source {
            DeprecationSource::Args(args) => Self::from_args(&String::from(args)),
            DeprecationSource::Fields(fields) => Ok(Self {
                date: fields.date.map(String::from),
                doc_url: fields.doc_url,
                sunset: fields.sunset.map(String::from),
            }),
        }
    }
}

/// Service configuration: the deprecated route table plus server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Address the server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Deprecated routes, matched in order
    #[serde(default)]
    pub routes: Vec<DeprecatedRoute>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            routes: Vec::new(),
            settings: Settings::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse, validate and compile configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.compile()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            route.validate()?;
            if !seen.insert(route.id.as_str()) {
                return Err(ConfigError::DuplicateId(route.id.clone()));
            }
        }
        Ok(())
    }

    /// Compile path patterns once so matching does not rebuild them per request.
    pub fn compile(&mut self) -> Result<(), ConfigError> {
        for route in &mut self.routes {
            route.compile()?;
        }
        Ok(())
    }
}

/// Find the first deprecated route matching a path and method.
pub fn find_route<'a>(
    routes: &'a [DeprecatedRoute],
    path: &str,
    method: &str,
) -> Option<&'a DeprecatedRoute> {
    routes.iter().find(|r| r.matches(path, method))
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_true() -> bool {
    true
}

/// A route carrying deprecation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeprecatedRoute {
    /// Unique identifier, used in logs and metric labels
    pub id: String,

    /// Path to match (exact, prefix, or glob such as /api/v1/*)
    pub path: String,

    /// HTTP methods to match (empty means all methods)
    #[serde(default)]
    pub methods: Vec<String>,

    /// Deprecation metadata for responses of this route
    #[serde(default)]
    pub deprecation: DeprecationConfig,

    /// Compiled path matcher (not serialized)
    #[serde(skip)]
    pub path_matcher: Option<globset::GlobMatcher>,
}

impl DeprecatedRoute {
    pub fn new(id: impl Into<String>, path: impl Into<String>, deprecation: DeprecationConfig) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            methods: Vec::new(),
            deprecation,
            path_matcher: None,
        }
    }

    pub fn with_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the route configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if self.path.is_empty() {
            return Err(ConfigError::EmptyPath(self.id.clone()));
        }
        if self.is_pattern() {
            self.glob()?;
        }
        self.deprecation.check_schedule(&self.id);
        Ok(())
    }

    /// Build the glob matcher for pattern paths.
    pub fn compile(&mut self) -> Result<(), ConfigError> {
        if self.is_pattern() {
            self.path_matcher = Some(self.glob()?.compile_matcher());
        }
        Ok(())
    }

    /// Check if this route matches the given path and method.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        if !self.methods.is_empty() && !self.methods.iter().any(|m| m.eq_ignore_ascii_case(method)) {
            return false;
        }

        self.matches_path(path)
    }

    fn matches_path(&self, path: &str) -> bool {
        if !self.is_pattern() {
            // Exact match or prefix match on a segment boundary
            return path == self.path
                || path
                    .strip_prefix(self.path.as_str())
                    .is_some_and(|rest| rest.starts_with('/') || self.path.ends_with('/'));
        }

        match &self.path_matcher {
            Some(matcher) => matcher.is_match(path),
            None => self
                .glob()
                .map(|glob| glob.compile_matcher().is_match(path))
                .unwrap_or(false),
        }
    }

    fn is_pattern(&self) -> bool {
        self.path.contains(['*', '?', '[', '{'])
    }

    fn glob(&self) -> Result<globset::Glob, ConfigError> {
        globset::Glob::new(&self.path).map_err(|source| ConfigError::InvalidPattern {
            id: self.id.clone(),
            pattern: self.path.clone(),
            source,
        })
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Log every annotated response at debug level
    #[serde(default = "default_true")]
    pub log_annotations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_annotations: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to record Prometheus metrics
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prefix for metric names
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,

    /// Port for the metrics endpoint (0 = only with `--metrics`)
    #[serde(default)]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_metrics_prefix(),
            port: 0,
        }
    }
}

impl MetricsConfig {
    /// Port to serve `/metrics` on, if any.
    ///
    /// `--metrics-port` wins, `--metrics` alone falls back to the configured
    /// port or 9090, and nothing is served while metrics are disabled.
    pub fn server_port(&self, cli_enabled: bool, cli_port: Option<u16>) -> Option<u16> {
        if !self.enabled {
            return None;
        }
        match (cli_port, cli_enabled, self.port) {
            (Some(port), _, _) => Some(port),
            (None, true, 0) => Some(DEFAULT_METRICS_PORT),
            (None, _, 0) => None,
            (None, _, port) => Some(port),
        }
    }
}

fn default_metrics_prefix() -> String {
    "deprecation_middleware".to_string()
}
