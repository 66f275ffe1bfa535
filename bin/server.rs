// Dropping Area Logistics Tracker - Web Server
// REST API over the item store, view engine, and cash-out workflow

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use dropping_area::{
    compute_balances, compute_stats, compute_view, CashOutEngine, DropItem, ItemStatus,
    ItemStore, Role, SortKey, SortOrder, SqliteStore, StatusFilter, ViewFilters, APP_NAME,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<SqliteStore>,
    engine: Arc<CashOutEngine>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

/// View query parameters (admin list view)
#[derive(Deserialize, Default)]
struct ViewParams {
    search: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    order: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

impl ViewParams {
    fn to_filters(&self) -> ViewFilters {
        let mut filters = ViewFilters::default();
        if let Some(search) = &self.search {
            filters.set_search(search);
        }
        match self.status.as_deref() {
            None | Some("all") => {}
            Some(other) => {
                if let Some(status) = ItemStatus::parse(other) {
                    filters.set_status(StatusFilter::Status(status));
                }
            }
        }
        let key = match self.sort.as_deref() {
            Some("name") => SortKey::Name,
            Some("location") => SortKey::Location,
            _ => SortKey::Date,
        };
        let order = match self.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        filters.set_sort(key, order);
        if let Some(size) = self.page_size {
            filters.set_page_size(size);
        }
        if let Some(page) = self.page {
            filters.set_page(page);
        }
        filters
    }
}

/// Paged item view response
#[derive(Serialize)]
struct ViewResponse {
    items: Vec<DropItem>,
    total_count: usize,
    total_pages: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/items - Filtered, sorted, paginated admin view
async fn get_items(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> impl IntoResponse {
    match state.store.all_items() {
        Ok(items) => {
            let view = compute_view(
                &items,
                Role::Admin,
                "Administrator",
                &params.to_filters(),
            );
            let response = ViewResponse {
                items: view.page_items,
                total_count: view.total_count,
                total_pages: view.total_pages,
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting items: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(
                    ViewResponse {
                        items: vec![],
                        total_count: 0,
                        total_pages: 1,
                    },
                    e.to_string(),
                )),
            )
                .into_response()
        }
    }
}

/// GET /api/stats - Dashboard counters
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.all_items() {
        Ok(items) => {
            let stats = compute_stats(&items, Role::Admin, "Administrator");
            (StatusCode::OK, Json(ApiResponse::ok(stats))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting stats: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::err((), e.to_string())))
                .into_response()
        }
    }
}

/// GET /api/balances - Seller balance groups (admin)
async fn get_balances(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.all_items() {
        Ok(items) => {
            let balances = compute_balances(&items, Role::Admin);
            (StatusCode::OK, Json(ApiResponse::ok(balances))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting balances: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::err((), e.to_string())))
                .into_response()
        }
    }
}

/// POST /api/cashout/:seller - Archive a seller's claimed items
///
/// Balances are re-derived from live data here, never taken from the
/// request, so a stale client cannot double-process.
async fn cash_out_seller(
    State(state): State<AppState>,
    Path(seller): Path<String>,
) -> impl IntoResponse {
    let items = match state.store.all_items() {
        Ok(items) => items,
        Err(e) => {
            eprintln!("Error loading items for cash-out: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(serde_json::json!(null), e.to_string())),
            )
                .into_response();
        }
    };

    let balances = compute_balances(&items, Role::Admin);
    let group = match balances.iter().find(|g| g.name == seller) {
        Some(group) => group,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err(
                    serde_json::json!(null),
                    format!("No pending balance for seller: {}", seller),
                )),
            )
                .into_response();
        }
    };

    match state.engine.cash_out(state.store.as_ref(), Role::Admin, group) {
        Ok(outcome) => {
            let status = if outcome.is_complete() {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(ApiResponse::ok(serde_json::json!({
                "summary": outcome.summary(),
                "outcome": outcome,
            }))))
                .into_response()
        }
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::err(serde_json::json!(null), e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 {} - Web Server", APP_NAME);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dropping_area.db".to_string());

    let store = SqliteStore::open(std::path::Path::new(&db_path))
        .expect("Failed to open database");
    println!("✓ Database opened: {}", db_path);

    let state = AppState {
        store: Arc::new(store),
        engine: Arc::new(CashOutEngine::new()),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/items", get(get_items))
        .route("/stats", get(get_stats))
        .route("/balances", get(get_balances))
        .route("/cashout/:seller", post(cash_out_seller))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   Items:    http://localhost:3000/api/items");
    println!("   Balances: http://localhost:3000/api/balances");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
