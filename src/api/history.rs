// src/api/history.rs
use crate::api::ApiResponse;
use crate::history::{HistoryEntry, HistorySummary};
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};

const DEFAULT_LIST_LIMIT: usize = 30;

#[get("/history?<limit>")]
pub async fn list_history(
    state: &State<ServerState>,
    limit: Option<usize>,
) -> Json<ApiResponse<Vec<HistorySummary>>> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(200);
    Json(ApiResponse::success(state.history.list(limit).await))
}

#[get("/history/<id>")]
pub async fn get_history_entry(
    state: &State<ServerState>,
    id: i64,
) -> Json<ApiResponse<HistoryEntry>> {
    match state.history.get(id).await {
        Some(entry) => Json(ApiResponse::success(entry)),
        None => Json(ApiResponse::error(format!("history entry {id} not found"))),
    }
}
