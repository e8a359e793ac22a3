//! Integration tests for the deprecation middleware.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use deprecation_middleware::metrics::DeprecationMetrics;
use deprecation_middleware::{
    annotate_routes, deprecated, DiagnosticSink, DeprecationLayerState, MemorySink,
    RouteDeprecation, ServiceConfig,
};
use std::sync::Arc;
use tower::ServiceExt;

const DOC_URL: &str = "https://docs.example.com/deprecation";
const LINK_VALUE: &str =
    "<https://docs.example.com/deprecation>; rel=\"deprecation\"; type=\"text/html\"";

fn route_app(args: &str, sink: Arc<MemorySink>) -> Router {
    let rule = RouteDeprecation::from_args(args)
        .unwrap()
        .with_sink(sink as Arc<dyn DiagnosticSink>);

    Router::new()
        .route("/deprecated", get(|| async { "ok" }))
        .route_layer(from_fn_with_state(Arc::new(rule), deprecated))
        .route("/current", get(|| async { "ok" }))
}

async fn get_path(app: Router, path: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).map(|v| v.to_str().unwrap())
}

#[tokio::test]
async fn test_deprecation_header_is_set() {
    let sink = Arc::new(MemorySink::new());
    let app = route_app("2024-06-01T00:00:00Z", sink.clone());

    let response = get_path(app, "/deprecated").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "Deprecation"),
        Some("Sat, 01 Jun 2024 00:00:00 GMT")
    );
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_bare_middleware_sets_true() {
    let app = route_app("", Arc::new(MemorySink::new()));

    let response = get_path(app, "/deprecated").await;
    assert_eq!(header(&response, "Deprecation"), Some("true"));
    assert!(response.headers().get("Link").is_none());
    assert!(response.headers().get("Sunset").is_none());
}

#[tokio::test]
async fn test_link_and_sunset_headers_are_set() {
    let app = route_app(
        &format!("2024-06-01T00:00:00Z,{},2024-12-01T00:00:00Z", DOC_URL),
        Arc::new(MemorySink::new()),
    );

    let response = get_path(app, "/deprecated").await;
    assert_eq!(
        header(&response, "Deprecation"),
        Some("Sat, 01 Jun 2024 00:00:00 GMT")
    );
    assert_eq!(header(&response, "Link"), Some(LINK_VALUE));
    assert_eq!(header(&response, "Sunset"), Some("Sun, 01 Dec 2024 00:00:00 GMT"));
}

#[tokio::test]
async fn test_sunset_header_not_set_if_invalid() {
    let sink = Arc::new(MemorySink::new());
    let app = route_app(
        &format!("2024-06-01T00:00:00Z,{},invalid-date", DOC_URL),
        sink.clone(),
    );

    let response = get_path(app, "/deprecated").await;
    assert_eq!(
        header(&response, "Deprecation"),
        Some("Sat, 01 Jun 2024 00:00:00 GMT")
    );
    assert!(response.headers().get("Sunset").is_none());

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Invalid Sunset date format"));
    assert!(messages[0].ends_with("invalid-date"));
}

#[tokio::test]
async fn test_sunset_header_not_set_if_before_deprecation() {
    let sink = Arc::new(MemorySink::new());
    let app = route_app(
        &format!("2024-06-01T00:00:00Z,{},2024-01-01T00:00:00Z", DOC_URL),
        sink.clone(),
    );

    let response = get_path(app, "/deprecated").await;
    assert_eq!(
        header(&response, "Deprecation"),
        Some("Sat, 01 Jun 2024 00:00:00 GMT")
    );
    assert!(response.headers().get("Sunset").is_none());

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Sunset date (2024-01-01T00:00:00Z) is before Deprecation date"));
}

#[tokio::test]
async fn test_skipped_date_position() {
    let app = route_app(
        &format!(",,{},2024-12-01T00:00:00Z", DOC_URL),
        Arc::new(MemorySink::new()),
    );

    let response = get_path(app, "/deprecated").await;
    assert_eq!(header(&response, "Deprecation"), Some("true"));
    assert_eq!(header(&response, "Link"), Some(LINK_VALUE));
    assert_eq!(header(&response, "Sunset"), Some("Sun, 01 Dec 2024 00:00:00 GMT"));
}

#[tokio::test]
async fn test_other_routes_untouched() {
    let app = route_app("2024-06-01T00:00:00Z", Arc::new(MemorySink::new()));

    let response = get_path(app, "/current").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("Deprecation").is_none());
}

#[tokio::test]
async fn test_handler_response_is_preserved() {
    let rule = Arc::new(RouteDeprecation::from_args("1717200000").unwrap());
    let app = Router::new()
        .route(
            "/teapot",
            get(|| async { (StatusCode::IM_A_TEAPOT, [("x-handler", "yes")], "short and stout") }),
        )
        .route_layer(from_fn_with_state(rule, deprecated));

    let response = get_path(app, "/teapot").await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(header(&response, "x-handler"), Some("yes"));
    assert_eq!(header(&response, "Deprecation"), Some("@1717200000"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"short and stout");
}

fn table_app(metrics: Option<DeprecationMetrics>, sink: Arc<MemorySink>) -> Router {
    let config = ServiceConfig::from_yaml(
        r#"
routes:
  - id: legacy-users
    path: /api/v1/users
    methods: [GET]
    deprecation: "2024-06-01T00:00:00Z,https://docs.example.com/deprecation,2024-01-01"
  - id: legacy-orders
    path: /api/v1/orders/*
    deprecation:
      date: "1717200000"
      sunset: "2030-01-01"
"#,
    )
    .unwrap();

    let state = Arc::new(
        DeprecationLayerState::from_config(&config)
            .with_sink(sink as Arc<dyn DiagnosticSink>)
            .with_metrics(metrics),
    );

    Router::new()
        .route("/api/v1/users", get(|| async { "users" }).post(|| async { "created" }))
        .route("/api/v1/orders/:id", get(|| async { "order" }))
        .route("/api/v2/users", get(|| async { "users" }))
        .layer(from_fn_with_state(state, annotate_routes))
}

#[tokio::test]
async fn test_route_table_matching() {
    let sink = Arc::new(MemorySink::new());

    let response = get_path(table_app(None, sink.clone()), "/api/v1/orders/42").await;
    assert_eq!(header(&response, "Deprecation"), Some("@1717200000"));
    assert_eq!(header(&response, "Sunset"), Some("Tue, 01 Jan 2030 00:00:00 GMT"));

    let response = get_path(table_app(None, sink.clone()), "/api/v2/users").await;
    assert!(response.headers().get("Deprecation").is_none());

    // method not listed for the route
    let response = table_app(None, sink.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("Deprecation").is_none());
}

#[tokio::test]
async fn test_route_table_records_metrics() {
    let metrics = DeprecationMetrics::new("test").unwrap();
    let sink = Arc::new(MemorySink::new());

    let response = get_path(table_app(Some(metrics.clone()), sink.clone()), "/api/v1/users").await;
    assert_eq!(
        header(&response, "Deprecation"),
        Some("Sat, 01 Jun 2024 00:00:00 GMT")
    );
    assert_eq!(header(&response, "Link"), Some(LINK_VALUE));
    assert!(response.headers().get("Sunset").is_none());
    assert_eq!(sink.messages().len(), 1);

    let output = metrics.encode();
    assert!(output.contains("test_annotated_responses_total{route_id=\"legacy-users\"} 1"));
    assert!(output.contains("reason=\"before_deprecation\""));
}

#[tokio::test]
async fn test_repeated_requests_yield_identical_headers() {
    let sink = Arc::new(MemorySink::new());
    let first = get_path(table_app(None, sink.clone()), "/api/v1/orders/1").await;
    let second = get_path(table_app(None, sink.clone()), "/api/v1/orders/1").await;

    assert_eq!(first.headers(), second.headers());
}
