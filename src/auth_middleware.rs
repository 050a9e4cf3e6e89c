use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

use crate::{error::AppError, token_manager::TokenManager};

/// Extractor for routes that call authenticated backend endpoints. Carries
/// the stored access token; rejects with 401 when it is missing or expired.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub access_token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for SignedIn
where
    Arc<TokenManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenManager>::from_ref(state);
        match tokens.valid_access_token().await {
            Some(access_token) => Ok(SignedIn { access_token }),
            None => {
                let reason = if tokens.access_token().await.is_some() {
                    "Session expirée, veuillez vous reconnecter"
                } else {
                    "Connexion requise"
                };
                Err(AppError::Unauthorized(reason.to_string()))
            }
        }
    }
}
