// Functions to interact with the Blassa REST backend (ride search, auth, notifications)

use anyhow::{anyhow, Context, Result};
use axum::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;

use crate::config::Settings;
use crate::models::{
    ErrorResponse, LoginRequest, MobileAuthResponse, Notification, RidePage, SearchParams,
};

/// Failure of a backend call. `Status` carries a message that can be shown to
/// the user as is.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        ApiError::Other(anyhow::Error::new(error))
    }
}

// Fallback messages when the backend sends no usable error body
pub fn default_error_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Requête invalide".to_string(),
        401 => "Email ou mot de passe incorrect".to_string(),
        403 => "Accès refusé".to_string(),
        404 => "Ressource introuvable".to_string(),
        409 => "Cette ressource existe déjà".to_string(),
        429 => "Trop de tentatives. Réessayez plus tard.".to_string(),
        500 | 502 | 503 => "Erreur serveur. Réessayez plus tard.".to_string(),
        code => format!("Erreur (code {})", code),
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, response_body = body, "Backend error details");
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_error_message(status));
    Err(ApiError::Status { status, message })
}

/// Source of ride search pages. Implemented over HTTP by [`BlassaClient`].
#[async_trait]
pub trait RideSearchApi: Send + Sync {
    async fn search_rides(&self, params: &SearchParams, page: u32, size: u32) -> Result<RidePage>;
}

#[derive(Clone)]
pub struct BlassaClient {
    http: Client,
    base_url: Url,
}

impl BlassaClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("blassa-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build reqwest client")?;
        let base_url = Url::parse(&settings.api_base_url)
            .with_context(|| format!("Invalid api_base_url '{}'", settings.api_base_url))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL '{}' cannot hold a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<MobileAuthResponse, ApiError> {
        let url = self.endpoint(&["auth", "mobile", "login"])?;
        tracing::debug!(url = %url, email = %request.email, "Logging in");
        let response = self.http.post(url).json(request).send().await?;
        let auth = check_status(response)
            .await?
            .json::<MobileAuthResponse>()
            .await
            .context("Failed to parse login response")?;
        Ok(auth)
    }

    pub async fn get_notifications(&self, token: &str) -> Result<Vec<Notification>, ApiError> {
        let url = self.endpoint(&["notifications"])?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let notifications = check_status(response)
            .await?
            .json::<Vec<Notification>>()
            .await
            .context("Failed to parse notifications")?;
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["notifications", id, "read"])?;
        let response = self.http.post(url).bearer_auth(token).send().await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, token: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["notifications", "read-all"])?;
        let response = self.http.post(url).bearer_auth(token).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RideSearchApi for BlassaClient {
    // Public endpoint: no Authorization header
    async fn search_rides(&self, params: &SearchParams, page: u32, size: u32) -> Result<RidePage> {
        let url = self.endpoint(&["rides", "search"])?;

        let mut query: Vec<(&str, String)> = vec![
            ("originLat", params.origin_lat.to_string()),
            ("originLon", params.origin_lon.to_string()),
            ("destLat", params.dest_lat.to_string()),
            ("destLon", params.dest_lon.to_string()),
            ("seats", params.passengers.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
        ];
        if let Some(departure_time) = params.departure_time() {
            query.push(("departureTime", departure_time));
        }
        if let Some(gender) = params.gender_filter {
            let value = serde_json::to_value(gender)?;
            if let Some(name) = value.as_str() {
                query.push(("genderFilter", name.to_string()));
            }
        }
        tracing::debug!(page, size, url = %url, "Searching rides");

        let response = self.http.get(url).query(&query).send().await?;
        let page_data = check_status(response)
            .await
            .with_context(|| format!("Ride search failed for page {}", page))?
            .json::<RidePage>()
            .await
            .with_context(|| format!("Failed to parse ride search page {}", page))?;

        tracing::debug!(
            page,
            returned = page_data.content.len(),
            total_pages = page_data.page.total_pages,
            "Received ride search page"
        );
        Ok(page_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> BlassaClient {
        let dir = std::env::temp_dir();
        let settings = Settings::for_tests(&format!("{}/api/v1/", server.base_url()), &dir);
        BlassaClient::new(&settings).unwrap()
    }

    fn ride_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "originName": "Tunis",
            "destinationName": "Sousse",
            "departureTime": "2026-10-20T08:00:00",
            "totalSeats": 4,
            "availableSeats": 3,
            "pricePerSeat": 15.0,
            "genderPreference": "FEMALE_ONLY",
            "status": "SCHEDULED"
        })
    }

    #[tokio::test]
    async fn search_sends_query_and_parses_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/rides/search")
                    .query_param("originLat", "36.8")
                    .query_param("destLon", "10.64")
                    .query_param("seats", "2")
                    .query_param("departureTime", "2026-10-20T00:00:00")
                    .query_param("genderFilter", "FEMALE_ONLY")
                    .query_param("page", "1")
                    .query_param("size", "20");
                then.status(200).json_body(json!({
                    "content": [ride_json("r1"), ride_json("r2")],
                    "page": { "size": 20, "totalElements": 22, "totalPages": 2, "number": 1 }
                }));
            })
            .await;

        let mut params = fixtures::params();
        params.gender_filter = Some(crate::models::GenderPreference::FemaleOnly);
        let page = client_for(&server).search_rides(&params, 1, 20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.page.total_pages, 2);
        assert_eq!(page.page.number, 1);
    }

    #[tokio::test]
    async fn search_surfaces_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/rides/search");
                then.status(500);
            })
            .await;

        let result = client_for(&server).search_rides(&fixtures::params(), 0, 20).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn login_maps_error_body_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/auth/mobile/login");
                then.status(401).json_body(json!({ "message": "Compte non vérifié" }));
            })
            .await;

        let request = LoginRequest {
            email: "rider@blassa.tn".into(),
            password: "wrong".into(),
        };
        match client_for(&server).login(&request).await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Compte non vérifié");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn falls_back_to_default_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/notifications/read-all");
                then.status(429).body("slow down");
            })
            .await;

        let err = client_for(&server)
            .mark_all_notifications_read("token")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Trop de tentatives. Réessayez plus tard.");
    }

    #[tokio::test]
    async fn notification_calls_carry_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/notifications/n-42/read")
                    .header("authorization", "Bearer abc");
                then.status(204);
            })
            .await;

        client_for(&server).mark_notification_read("abc", "n-42").await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn default_messages_cover_unknown_codes() {
        assert_eq!(default_error_message(StatusCode::IM_A_TEAPOT), "Erreur (code 418)");
        assert_eq!(default_error_message(StatusCode::BAD_GATEWAY), "Erreur serveur. Réessayez plus tard.");
    }
}
