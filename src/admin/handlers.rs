use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::http::server::AppState;
use crate::observability::{JournalQuery, JournalSnapshot};

/// `GET /metrics`: plain-text counter snapshot.
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.snapshot().render();
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

/// `GET /requests`: JSON journal snapshot with totals.
pub async fn get_requests(
    State(state): State<AppState>,
    Query(query): Query<JournalQuery>,
) -> Json<JournalSnapshot> {
    let (requests, retained) = state.journal.query(&query);

    // Read after copying so totals never trail the records shown.
    Json(JournalSnapshot {
        total_requests: state.metrics.total_requests(),
        total_errors: state.metrics.total_errors(),
        retained,
        requests,
    })
}
