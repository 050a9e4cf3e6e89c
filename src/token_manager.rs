// Stored credentials for the signed-in user, plus local JWT expiry checks.
// Constructed once in main and shared through AppState.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const CREDENTIALS_FILE: &str = "blassa_credentials.json";

// Only the claims needed locally; the server has already verified the token
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
    sub: Option<String>,
}

fn decode_unverified(token: &str) -> Option<ExpiryClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

/// Expiry instant of a JWT, if its payload can be read and carries `exp`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    decode_unverified(token)
        .and_then(|claims| claims.exp)
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

/// Subject (the user's email for Blassa tokens).
pub fn token_subject(token: &str) -> Option<String> {
    decode_unverified(token).and_then(|claims| claims.sub)
}

/// A token without a readable `exp` is treated as expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_unverified(token).and_then(|claims| claims.exp) {
        Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
        None => true,
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
struct StoredCredentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user_email: Option<String>,
    onboarding_completed: bool,
}

pub struct TokenManager {
    path: PathBuf,
    state: RwLock<StoredCredentials>,
}

impl TokenManager {
    /// Loads stored credentials from `data_dir`. A missing or unreadable file
    /// starts the manager signed out.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CREDENTIALS_FILE);
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable credentials file");
                StoredCredentials::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredCredentials::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(credentials).context("Failed to serialize credentials")?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub async fn save_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let mut state = self.state.write().await;
        state.access_token = Some(access_token.to_string());
        // Keep the previous refresh token when the backend doesn't rotate it
        if let Some(refresh) = refresh_token {
            state.refresh_token = Some(refresh.to_string());
        }
        self.persist(&state).await
    }

    pub async fn save_user_email(&self, email: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.user_email = Some(email.to_string());
        self.persist(&state).await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// The stored access token, only if it has not expired yet.
    pub async fn valid_access_token(&self) -> Option<String> {
        self.access_token()
            .await
            .filter(|token| !is_token_expired(token, Utc::now()))
    }

    pub async fn user_email(&self) -> Option<String> {
        self.state.read().await.user_email.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.valid_access_token().await.is_some()
    }

    pub async fn has_completed_onboarding(&self) -> bool {
        self.state.read().await.onboarding_completed
    }

    pub async fn set_onboarding_completed(&self, completed: bool) -> Result<()> {
        let mut state = self.state.write().await;
        state.onboarding_completed = completed;
        self.persist(&state).await
    }

    /// Signs out. The onboarding flag survives.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let onboarding_completed = state.onboarding_completed;
        *state = StoredCredentials {
            onboarding_completed,
            ..Default::default()
        };
        self.persist(&state).await
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub fn with_exp(exp: i64) -> String {
        let claims = serde_json::json!({ "sub": "rider@blassa.tn", "exp": exp });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
    }

    pub fn valid() -> String {
        with_exp(chrono::Utc::now().timestamp() + 3600)
    }

    pub fn expired() -> String {
        with_exp(chrono::Utc::now().timestamp() - 60)
    }
}
