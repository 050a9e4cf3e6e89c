// Notification list and badge; every backend call needs a signed-in user

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    auth_middleware::SignedIn,
    error::AppResult,
    models::Notification,
    notifications::NotificationCenter,
};

#[derive(Serialize)]
pub struct UnreadCount {
    count: u32,
}

pub async fn list_notifications(
    State(center): State<Arc<NotificationCenter>>,
    signed_in: SignedIn,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(center.load(&signed_in.access_token).await?))
}

pub async fn mark_read(
    State(center): State<Arc<NotificationCenter>>,
    signed_in: SignedIn,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    center.mark_read(&signed_in.access_token, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(center): State<Arc<NotificationCenter>>,
    signed_in: SignedIn,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(center.mark_all_read(&signed_in.access_token).await?))
}

pub async fn unread_count(State(center): State<Arc<NotificationCenter>>) -> Json<UnreadCount> {
    Json(UnreadCount {
        count: center.unread_count(),
    })
}
