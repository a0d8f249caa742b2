// src/api/search.rs
use crate::api::ApiResponse;
use crate::models::{SearchRequest, SearchResponse};
use crate::server::ServerState;
use rocket::{post, serde::json::Json, State};
use tracing::{error, info};

const TOP_RANGE: std::ops::RangeInclusive<usize> = 1..=15;
const PAGES_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

fn clamp(value: Option<usize>, default: usize, range: std::ops::RangeInclusive<usize>) -> usize {
    value
        .unwrap_or(default)
        .clamp(*range.start(), *range.end())
}

#[post("/search", data = "<request>")]
pub async fn run_search(
    state: &State<ServerState>,
    request: Json<SearchRequest>,
) -> Json<ApiResponse<SearchResponse>> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Json(ApiResponse::error("query must not be empty".to_string()));
    }

    let top = clamp(request.top, state.config.search.default_top, TOP_RANGE);
    let pages = clamp(request.pages, state.config.search.default_pages, PAGES_RANGE);
    info!("Search requested: query=\"{}\", top={}, pages={}", query, top, pages);

    let outcome = match state.engine.run(&query, top, pages).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Discovery run failed: {}", e);
            return Json(ApiResponse::error(e.to_string()));
        }
    };

    // History is best-effort; a failed write does not fail the search.
    let history_id = match state
        .history
        .save(&query, outcome.results.clone(), outcome.logs.clone())
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            error!("Failed to persist run history: {}", e);
            None
        }
    };

    Json(ApiResponse::success(SearchResponse {
        query,
        total: outcome.results.len(),
        results: outcome.results,
        logs: outcome.logs,
        history_id,
    }))
}
