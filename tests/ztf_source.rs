//! Cross-match client against a local stand-in for the light-curve service.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use common::{serve, ZTF_VOTABLE};
use varwise_view::core::Scalar;
use varwise_view::sources::{parse_columns, ZtfSource};
use varwise_view::Error;

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn votable_service(body: &'static str, status: StatusCode) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/nph_light_curves",
            get(
                move |State(seen): State<Seen>, Query(params): Query<HashMap<String, String>>| async move {
                    seen.lock().unwrap().push(params);
                    (status, body)
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let base = serve(router).await;
    (format!("{}/nph_light_curves", base), seen)
}

fn source(endpoint: &str) -> ZtfSource {
    ZtfSource::with_endpoint(endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_cone_search_returns_requested_columns() {
    let (endpoint, seen) = votable_service(ZTF_VOTABLE, StatusCode::OK).await;

    let table = source(&endpoint)
        .query(10.5, -5.25, 5.0, &parse_columns(None))
        .await
        .unwrap();

    assert_eq!(table.column_names().collect::<Vec<_>>(), ["mag", "magerr", "mjd"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.column("mjd").unwrap(), &[Scalar::Float(58200.25), Scalar::Float(58201.25)]);
    assert!(matches!(table.column("mag").unwrap()[1], Scalar::Float(v) if v.is_nan()));

    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["mag"], serde_json::json!([17.5, null]));

    let params = seen.lock().unwrap();
    assert_eq!(params.len(), 1);
    assert!(params[0]["POS"].starts_with("CIRCLE 10.5 -5.25 0.00138"));
    assert_eq!(params[0]["BAD_CATFLAGS_MASK"], "32768");
}

#[tokio::test]
async fn test_text_columns_survive() {
    let (endpoint, _) = votable_service(ZTF_VOTABLE, StatusCode::OK).await;
    let table = source(&endpoint)
        .query(0.0, 0.0, 2.0, &["filtercode".to_string(), "oid".to_string()])
        .await
        .unwrap();
    assert_eq!(table.column("filtercode").unwrap()[1], Scalar::Text("zr".into()));
    assert_eq!(table.column("oid").unwrap()[0], Scalar::Int(685));
}

#[tokio::test]
async fn test_missing_column_fails() {
    let (endpoint, _) = votable_service(ZTF_VOTABLE, StatusCode::OK).await;
    let err = source(&endpoint)
        .query(0.0, 0.0, 5.0, &["mag".to_string(), "catflags".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamQueryFailed(ref m) if m.contains("catflags")));
}

#[tokio::test]
async fn test_http_error_status_fails() {
    let (endpoint, _) = votable_service("overloaded", StatusCode::SERVICE_UNAVAILABLE).await;
    let err = source(&endpoint).query(0.0, 0.0, 5.0, &parse_columns(None)).await.unwrap_err();
    assert!(matches!(err, Error::UpstreamQueryFailed(ref m) if m.contains("503")));
}

#[tokio::test]
async fn test_error_query_status_fails() {
    const FAILED: &str = r#"<VOTABLE><RESOURCE type="results">
        <INFO name="QUERY_STATUS" value="ERROR">position out of range</INFO>
        </RESOURCE></VOTABLE>"#;
    let (endpoint, _) = votable_service(FAILED, StatusCode::OK).await;
    let err = source(&endpoint).query(0.0, 0.0, 5.0, &parse_columns(None)).await.unwrap_err();
    assert!(matches!(err, Error::UpstreamQueryFailed(ref m) if m.contains("position out of range")));
}

#[tokio::test]
async fn test_unreachable_service_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = source(&format!("http://{}/nph_light_curves", addr))
        .query(0.0, 0.0, 5.0, &parse_columns(None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamQueryFailed(_)));
}
