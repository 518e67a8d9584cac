//! Search suggestion endpoint for the header search box.

use axum::{
    Json,
    extract::{Query, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use decor_api::storefront::MIN_SUGGESTION_QUERY;
use serde::Deserialize;
use tracing::instrument;

use crate::state::AppState;
use crate::views::Suggestion;

/// Search suggestions query parameters.
#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

/// Suggestions for a partial query, as JSON.
///
/// Short queries answer `[]` without touching the backend. Backend failures
/// also answer `[]`: the search page itself still works.
#[instrument(skip(state))]
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> impl IntoResponse {
    let currency = state.currency();
    let suggestions: Vec<Suggestion> = if query.q.trim().chars().count() < MIN_SUGGESTION_QUERY {
        Vec::new()
    } else {
        match state.api().suggestions(&query.q).await {
            Ok(found) => found.iter().map(|p| Suggestion::new(p, currency)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Search suggestions failed");
                Vec::new()
            }
        }
    };

    ([(CACHE_CONTROL, "public, max-age=60")], Json(suggestions))
}
