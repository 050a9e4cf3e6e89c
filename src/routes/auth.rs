// Login / logout through the backend and the local credential store

use axum::extract::{Json, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    blassa_api::BlassaClient,
    error::{AppError, AppResult},
    models::LoginRequest,
    token_manager::{self, TokenManager},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    logged_in: bool,
    email: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    onboarding_completed: bool,
}

async fn current_status(tokens: &TokenManager) -> AuthStatus {
    let access_token = tokens.valid_access_token().await;
    AuthStatus {
        logged_in: access_token.is_some(),
        email: tokens.user_email().await,
        expires_at: access_token.as_deref().and_then(token_manager::token_expiry),
        onboarding_completed: tokens.has_completed_onboarding().await,
    }
}

pub async fn handle_login(
    State(api): State<BlassaClient>,
    State(tokens): State<Arc<TokenManager>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthStatus>> {
    tracing::info!("Login attempt for {}", request.email);
    let response = api.login(&request).await?;

    // e.g. status "VERIFICATION_REQUIRED" comes back as 200 without tokens
    let Some(access_token) = response.access_token.as_deref() else {
        let message = response.message.unwrap_or(response.status);
        return Err(AppError::Unauthorized(message));
    };
    tokens
        .save_tokens(access_token, response.refresh_token.as_deref())
        .await?;
    // Blassa tokens carry the email as subject
    let email = response
        .email
        .clone()
        .or_else(|| token_manager::token_subject(access_token))
        .unwrap_or_else(|| request.email.clone());
    tokens.save_user_email(&email).await?;
    tracing::info!("Login successful for {}", email);

    Ok(Json(current_status(&tokens).await))
}

pub async fn handle_logout(State(tokens): State<Arc<TokenManager>>) -> AppResult<Json<AuthStatus>> {
    tokens.clear().await?;
    tracing::info!("Logged out, credentials cleared");
    Ok(Json(current_status(&tokens).await))
}

pub async fn auth_status(State(tokens): State<Arc<TokenManager>>) -> Json<AuthStatus> {
    Json(current_status(&tokens).await)
}

pub async fn complete_onboarding(State(tokens): State<Arc<TokenManager>>) -> AppResult<Json<AuthStatus>> {
    tokens.set_onboarding_completed(true).await?;
    Ok(Json(current_status(&tokens).await))
}
