use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analysis::run_price_check;
use crate::config::{HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT};
use crate::db::{CheckStore, HistoryFilter};
use crate::error::AppError;
use crate::extract::CheckRequest;
use crate::fetcher::DocumentFetcher;
use crate::oracle::FairnessOracle;
use crate::types::{CheckSummary, StoredCheck};

#[derive(Clone)]
pub struct ApiState {
    pub store: CheckStore,
    pub fetcher: DocumentFetcher,
    pub oracle: Arc<FairnessOracle>,
    pub currency: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/check", post(post_check))
        .route("/check/:id", get(get_check))
        .route("/history", get(get_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Kept as raw strings so junk values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub recommendation: Option<String>,
}

impl HistoryQuery {
    /// `(page, limit)`: page >= 1, limit in [1, HISTORY_MAX_LIMIT].
    fn paging(&self) -> (i64, i64) {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        let page = parse(&self.page).unwrap_or(1).max(1);
        let limit = parse(&self.limit)
            .filter(|l| *l != 0)
            .unwrap_or(HISTORY_DEFAULT_LIMIT)
            .clamp(1, HISTORY_MAX_LIMIT);
        (page, limit)
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CheckResponse {
    pub success: bool,
    #[serde(flatten)]
    pub check: StoredCheck,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub items: Vec<CheckSummary>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn post_check(
    State(state): State<ApiState>,
    body: Option<Json<CheckRequest>>,
) -> Result<Json<CheckResponse>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let check = run_price_check(&state, &req).await?;
    Ok(Json(CheckResponse { success: true, check }))
}

async fn get_check(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<StoredCheck>, AppError> {
    state
        .store
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn get_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let (page, limit) = params.paging();
    let filter =
        HistoryFilter::from_params(params.category.as_deref(), params.recommendation.as_deref());

    // Pages far past the end saturate to an offset that matches nothing.
    let skip = (page - 1).saturating_mul(limit);
    let items = state.store.find_many(filter, skip, limit).await?;
    let total = state.store.count(filter).await?;
    let total_pages = ((total + limit - 1) / limit).max(1);

    Ok(Json(HistoryResponse { items, total, page, limit, total_pages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::db::store::tests::seeded_store;

    fn state(store: CheckStore) -> ApiState {
        ApiState {
            store,
            fetcher: DocumentFetcher::new().unwrap(),
            oracle: Arc::new(FairnessOracle::Unconfigured),
            currency: "INR".to_string(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: serde_json::Value) -> Request<Body> {
        Request::post("/check")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn paging_defaults_and_clamps() {
        let q = |page: Option<&str>, limit: Option<&str>| HistoryQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(q(None, None).paging(), (1, 10));
        assert_eq!(q(Some("0"), Some("500")).paging(), (1, 50));
        assert_eq!(q(Some("abc"), Some("-3")).paging(), (1, 1));
        assert_eq!(q(Some("3"), Some("0")).paging(), (3, 10));
    }

    #[tokio::test]
    async fn pasted_check_is_analyzed_and_stored() {
        let store = CheckStore::in_memory().await.unwrap();
        let app = router(state(store.clone()));

        let (status, body) = send(
            app.clone(),
            post_json(serde_json::json!({ "pastedText": "Acme Blender\n₹2,499\nDiscounted price" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["title"], "Acme Blender Discounted price");
        assert_eq!(body["currentPrice"], 2499.0);
        assert_eq!(body["type"], "product");
        assert_eq!(body["source"], "Pasted");
        assert_eq!(body["currency"], "INR");
        assert_eq!(body["recommendation"], "neutral");

        let id = body["id"].as_str().unwrap();
        let (status, detail) = send(app, get(&format!("/check/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["title"], "Acme Blender Discounted price");
        assert_eq!(store.count(HistoryFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_price_is_bad_request_and_not_stored() {
        let store = CheckStore::in_memory().await.unwrap();
        let app = router(state(store.clone()));

        let (status, body) = send(app, post_json(serde_json::json!({ "pastedText": "no price here" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert_eq!(store.count(HistoryFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unparseable_body_is_invalid_input() {
        let app = router(state(CheckStore::in_memory().await.unwrap()));
        let req = Request::post("/check").body(Body::from("not json")).unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn history_pagination() {
        let app = router(state(seeded_store(12).await));
        let (status, body) = send(app, get("/history?page=2&limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 5);
        assert_eq!(body["total"], 12);
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["totalPages"], 3);
    }

    #[tokio::test]
    async fn history_page_past_the_end_is_empty() {
        let app = router(state(seeded_store(3).await));
        let (status, body) = send(app, get("/history?page=9223372036854775807&limit=50")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["items"].as_array().unwrap().is_empty());
        assert_eq!(body["total"], 3);
        assert_eq!(body["page"], i64::MAX);
        assert_eq!(body["totalPages"], 1);
    }

    #[tokio::test]
    async fn history_ignores_unknown_filters_and_clamps_limit() {
        let app = router(state(seeded_store(3).await));
        let (_, body) = send(app, get("/history?type=boat&recommendation=x&limit=999")).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["limit"], 50);
        assert_eq!(body["totalPages"], 1);
    }

    #[tokio::test]
    async fn empty_history_has_one_page() {
        let app = router(state(CheckStore::in_memory().await.unwrap()));
        let (_, body) = send(app, get("/history")).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["totalPages"], 1);
    }

    #[tokio::test]
    async fn unknown_check_is_not_found() {
        let app = router(state(CheckStore::in_memory().await.unwrap()));
        let (status, body) = send(app, get("/check/does-not-exist")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = router(state(CheckStore::in_memory().await.unwrap()));
        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
