// Handlers for the search session and the recent searches list

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    filters::SearchFilters,
    models::SearchParams,
    recent_searches::RecentSearches,
    search_session::{LoadOutcome, SearchSession, SearchView},
};

#[derive(Serialize)]
pub struct LoadResponse {
    outcome: LoadOutcome,
    #[serde(flatten)]
    view: SearchView,
}

fn validate(params: &SearchParams) -> AppResult<()> {
    if params.passengers == 0 {
        return Err(AppError::BadRequest("passengers must be at least 1".to_string()));
    }
    let coordinates = [params.origin_lat, params.origin_lon, params.dest_lat, params.dest_lon];
    if coordinates.iter().any(|c| !c.is_finite()) {
        return Err(AppError::BadRequest("coordinates must be finite numbers".to_string()));
    }
    Ok(())
}

pub async fn start_search(
    State(search): State<Arc<SearchSession>>,
    State(recent): State<Arc<RecentSearches>>,
    Json(params): Json<SearchParams>,
) -> AppResult<Json<LoadResponse>> {
    validate(&params)?;
    tracing::info!("API call: start_search {} -> {}", params.from, params.to);

    recent.add(&params).await;
    let outcome = search.start(params).await?;
    Ok(Json(LoadResponse {
        outcome,
        view: search.view().await,
    }))
}

pub async fn get_search(State(search): State<Arc<SearchSession>>) -> Json<SearchView> {
    Json(search.view().await)
}

pub async fn load_more(State(search): State<Arc<SearchSession>>) -> AppResult<Json<LoadResponse>> {
    let outcome = search.load_more().await?;
    Ok(Json(LoadResponse {
        outcome,
        view: search.view().await,
    }))
}

pub async fn retry_search(State(search): State<Arc<SearchSession>>) -> AppResult<Json<LoadResponse>> {
    let outcome = search
        .retry()
        .await?
        .ok_or_else(|| AppError::BadRequest("No search to retry".to_string()))?;
    Ok(Json(LoadResponse {
        outcome,
        view: search.view().await,
    }))
}

pub async fn update_filters(
    State(search): State<Arc<SearchSession>>,
    Json(filters): Json<SearchFilters>,
) -> Json<SearchView> {
    search.set_filters(filters).await;
    Json(search.view().await)
}

pub async fn reset_filters(State(search): State<Arc<SearchSession>>) -> Json<SearchView> {
    search.reset_filters().await;
    Json(search.view().await)
}

pub async fn list_recent_searches(State(recent): State<Arc<RecentSearches>>) -> impl IntoResponse {
    Json(recent.list().await)
}

pub async fn clear_recent_searches(State(recent): State<Arc<RecentSearches>>) -> StatusCode {
    recent.clear().await;
    StatusCode::NO_CONTENT
}

pub async fn remove_recent_search(
    State(recent): State<Arc<RecentSearches>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if recent.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No recent search with id '{}'", id)))
    }
}
