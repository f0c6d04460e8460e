//! HTTP server for VarWISE View
//!
//! Serves the catalog browser, the catalog grid API, object detail pages and
//! the ZTF cross-match proxy.

use crate::{
    api::{ObjectDetail, VarwiseApi},
    core::ClusterId,
    http::pages,
    querying::pagination::{GridRequest, PageRequest, SortDirection, SortSpec},
    sources::ztf_source::{parse_columns, CrossMatchTable},
    storage::catalog_store::parse_pure_flag,
    Error,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Cone radius in arcseconds when the client does not give one.
pub const DEFAULT_RADIUS_ARCSEC: f64 = 5.0;

type Params = HashMap<String, String>;

/// Response for grid clients using `draw/start/length`
#[derive(Debug, Serialize)]
pub struct DrawResponse {
    pub draw: i64,
    #[serde(rename = "recordsTotal")]
    pub records_total: usize,
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: usize,
    pub data: Vec<Map<String, Value>>,
}

/// Response for clients using `page/limit`
#[derive(Debug, Serialize)]
pub struct PagedResponse {
    pub data: Vec<Map<String, Value>>,
    pub page: usize,
    pub limit: usize,
    /// Rows matching the filter
    pub total_rows: usize,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shared application state
pub struct AppState {
    pub api: Arc<VarwiseApi>,
}

/// Custom error type for API errors
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            e if e.is_filter_error() => ApiError::BadRequest(format!("Invalid filter: {}", e)),
            e if e.is_client_error() => ApiError::BadRequest(e.to_string()),
            Error::ObjectNotFound(_) => ApiError::NotFound("Not found".to_string()),
            Error::UpstreamQueryFailed(msg) => {
                ApiError::Upstream(format!("ZTF query failed: {}", msg))
            }
            e => {
                error!(error = %e, "request failed");
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

/// Create the HTTP server with all routes
pub fn create_server(api: Arc<VarwiseApi>) -> Router {
    let state = Arc::new(AppState { api });

    // Configure CORS
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/catalog", get(catalog_data))
        .route("/object/:id", get(object_page))
        .route("/api/object/:id", get(object_data))
        .route("/api/ztf", get(ztf_crossmatch))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn pure_param(params: &Params) -> bool {
    parse_pure_flag(params.get("pure").map(String::as_str))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(SuccessResponse { message: "VarWISE View is running".to_string() })
}

/// GET / - Catalog browser
async fn index(State(state): State<Arc<AppState>>, Query(params): Query<Params>) -> Html<String> {
    let pure = pure_param(&params);
    let filter = params.get("filter").map_or("", String::as_str);
    Html(pages::index_page(state.api.catalog(pure), pure, filter))
}

/// GET /api/catalog - Filtered, sorted, paginated catalog rows
async fn catalog_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Result<Response, ApiError> {
    let grid = GridRequest::from_params(&params)?;
    let pure = pure_param(&params);

    let sort = params.get("order_col").filter(|c| !c.is_empty()).map(|column| SortSpec {
        column: column.clone(),
        direction: SortDirection::parse(params.get("order_dir").map(String::as_str)),
    });
    let request = PageRequest {
        filter: params.get("filter").cloned(),
        sort,
        offset: grid.offset(),
        limit: grid.limit(),
    };

    let page = state.api.catalog_page(pure, &request)?;
    let data = page.shaped_rows();

    let response = match grid {
        GridRequest::Draw(r) => Json(DrawResponse {
            draw: r.draw,
            records_total: page.total_count,
            records_filtered: page.filtered_count,
            data,
        })
        .into_response(),
        GridRequest::Paged(r) => Json(PagedResponse {
            data,
            page: r.page,
            limit: r.limit,
            total_rows: page.filtered_count,
        })
        .into_response(),
    };
    Ok(response)
}

/// Run the blocking object lookup off the async workers.
async fn load_detail(state: &AppState, id: ClusterId, pure: bool) -> crate::Result<ObjectDetail> {
    let api = Arc::clone(&state.api);
    tokio::task::spawn_blocking(move || api.object_detail(id, pure))
        .await
        .map_err(|e| Error::Dataset(format!("object lookup task failed: {}", e)))?
}

fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// GET /object/:id - Object detail page
async fn object_page(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    let Ok(id) = raw_id.parse::<ClusterId>() else {
        return not_found_page();
    };
    let pure = pure_param(&params);
    match load_detail(&state, id, pure).await {
        Ok(detail) => Html(pages::object_page(&detail, pure)).into_response(),
        Err(Error::ObjectNotFound(_)) => not_found_page(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/object/:id - Object detail as JSON
async fn object_data(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Query(params): Query<Params>,
) -> Result<Json<ObjectDetail>, ApiError> {
    let id = raw_id
        .parse::<ClusterId>()
        .map_err(|_| ApiError::NotFound("Not found".to_string()))?;
    let detail = load_detail(&state, id, pure_param(&params)).await?;
    Ok(Json(detail))
}

/// GET /api/ztf - Cone-search cross-match against ZTF
async fn ztf_crossmatch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Result<Json<CrossMatchTable>, ApiError> {
    let (Some(ra), Some(dec)) = (params.get("ra"), params.get("dec")) else {
        return Err(ApiError::BadRequest("Missing ra/dec".to_string()));
    };
    let (Ok(ra), Ok(dec)) = (ra.trim().parse::<f64>(), dec.trim().parse::<f64>()) else {
        return Err(ApiError::BadRequest("Invalid ra/dec".to_string()));
    };
    let radius = match params.get("rad") {
        Some(rad) => rad
            .trim()
            .parse::<f64>()
            .map_err(|_| ApiError::BadRequest("Invalid rad".to_string()))?,
        None => DEFAULT_RADIUS_ARCSEC,
    };
    let columns = parse_columns(params.get("cols").map(String::as_str));

    let table = state.api.crossmatch(ra, dec, radius, &columns).await?;
    Ok(Json(table))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Start the HTTP server on the specified address
pub async fn start_server(addr: &str, api: Arc<VarwiseApi>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(api);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "VarWISE View listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}
