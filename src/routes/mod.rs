// Route definitions

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod auth;
mod notifications;
mod search;

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        // Search session
        .route("/search", post(search::start_search).get(search::get_search))
        .route("/search/more", post(search::load_more))
        .route("/search/retry", post(search::retry_search))
        .route(
            "/search/filters",
            put(search::update_filters).delete(search::reset_filters),
        )
        .route(
            "/recent-searches",
            get(search::list_recent_searches).delete(search::clear_recent_searches),
        )
        .route("/recent-searches/:id", delete(search::remove_recent_search))
        // Credentials
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/status", get(auth::auth_status))
        .route("/onboarding/complete", post(auth::complete_onboarding))
        // Routes requiring a signed-in user
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/notifications/unread-count", get(notifications::unread_count));

    Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blassa_api::BlassaClient,
        config::Settings,
        search_session::testing::{page, Reply, ScriptedApi},
        token_manager::test_tokens,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        state: AppState,
        _dir: tempfile::TempDir,
    }

    async fn harness(api_base: &str, replies: Vec<Reply>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_tests(api_base, dir.path());
        let client = BlassaClient::new(&settings).unwrap();
        let state = AppState::assemble(settings, client, ScriptedApi::new(replies))
            .await
            .unwrap();
        Harness {
            app: create_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn search_body() -> Value {
        json!({
            "from": "Tunis",
            "to": "Sousse",
            "originLat": 36.8,
            "originLon": 10.18,
            "destLat": 35.83,
            "destLon": 10.64,
            "date": "2026-10-20",
            "passengers": 1
        })
    }

    #[tokio::test]
    async fn search_flow_records_recent_search_and_paginates() {
        let h = harness(
            "http://localhost/api/v1/",
            vec![Reply::Page(page(&["a", "b"], 0, 2)), Reply::Page(page(&["b", "c"], 1, 2))],
        )
        .await;

        let (status, body) = call(&h.app, "POST", "/api/search", Some(search_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "loaded");
        assert_eq!(body["rides"].as_array().unwrap().len(), 2);
        assert_eq!(body["isLoading"], false);

        let (_, more) = call(&h.app, "POST", "/api/search/more", None).await;
        assert_eq!(more["totalRides"], 3);
        assert_eq!(more["isLastPage"], true);

        let (_, again) = call(&h.app, "POST", "/api/search/more", None).await;
        assert_eq!(again["outcome"], "skipped");

        let (_, recent) = call(&h.app, "GET", "/api/recent-searches", None).await;
        assert_eq!(recent.as_array().unwrap().len(), 1);
        assert_eq!(recent[0]["from"], "Tunis");
    }

    #[tokio::test]
    async fn failed_first_page_is_reported_in_view() {
        let h = harness("http://localhost/api/v1/", vec![Reply::Fail]).await;
        let (status, body) = call(&h.app, "POST", "/api/search", Some(search_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "failed");
        assert_eq!(body["error"], "Erreur lors de la recherche");
        assert!(body["rides"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn filters_reshape_the_view() {
        let h = harness("http://localhost/api/v1/", vec![Reply::Page(page(&["a", "b"], 0, 1))]).await;
        call(&h.app, "POST", "/api/search", Some(search_body())).await;

        let (_, filtered) = call(
            &h.app,
            "PUT",
            "/api/search/filters",
            Some(json!({ "maxPrice": 5, "sortBy": "price_desc" })),
        )
        .await;
        assert!(filtered["rides"].as_array().unwrap().is_empty());
        assert_eq!(filtered["totalRides"], 2);
        assert_eq!(filtered["activeFiltersCount"], 2);

        let (_, reset) = call(&h.app, "DELETE", "/api/search/filters", None).await;
        assert_eq!(reset["rides"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_bad_search_and_retry_without_search() {
        let h = harness("http://localhost/api/v1/", vec![]).await;
        let mut body = search_body();
        body["passengers"] = json!(0);
        let (status, _) = call(&h.app, "POST", "/api/search", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&h.app, "POST", "/api/search/retry", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&h.app, "DELETE", "/api/recent-searches/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn notifications_require_login() {
        let h = harness("http://localhost/api/v1/", vec![]).await;
        let (status, body) = call(&h.app, "GET", "/api/notifications", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Connexion requise");

        h.state.tokens.save_tokens(&test_tokens::expired(), None).await.unwrap();
        let (status, _) = call(&h.app, "GET", "/api/notifications", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&h.app, "GET", "/api/notifications/unread-count", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn login_stores_tokens_and_unlocks_notifications() {
        let server = MockServer::start_async().await;
        let token = test_tokens::valid();
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/auth/mobile/login")
                    .json_body(json!({ "email": "rider@blassa.tn", "password": "secret" }));
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "accessToken": token,
                    "refreshToken": "refresh-1",
                    "email": "rider@blassa.tn"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/notifications")
                    .header("authorization", format!("Bearer {}", token));
                then.status(200).json_body(json!([{
                    "id": "n1",
                    "type": "NEW_BOOKING",
                    "title": "Nouvelle réservation",
                    "message": "Un passager a réservé",
                    "isRead": false,
                    "link": null,
                    "createdAt": "2026-10-15T10:00:00"
                }]));
            })
            .await;

        let h = harness(&format!("{}/api/v1/", server.base_url()), vec![]).await;
        let (status, body) = call(
            &h.app,
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "rider@blassa.tn", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loggedIn"], true);
        assert_eq!(body["email"], "rider@blassa.tn");

        let (status, list) = call(&h.app, "GET", "/api/notifications", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        let (_, count) = call(&h.app, "GET", "/api/notifications/unread-count", None).await;
        assert_eq!(count["count"], 1);

        call(&h.app, "POST", "/api/onboarding/complete", None).await;
        let (_, status_after_logout) = call(&h.app, "POST", "/api/auth/logout", None).await;
        assert_eq!(status_after_logout["loggedIn"], false);
        assert_eq!(status_after_logout["onboardingCompleted"], true);
    }

    #[tokio::test]
    async fn login_rejection_keeps_backend_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/auth/mobile/login");
                then.status(401).json_body(json!({ "status": 401 }));
            })
            .await;

        let h = harness(&format!("{}/api/v1/", server.base_url()), vec![]).await;
        let (status, body) = call(
            &h.app,
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "rider@blassa.tn", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Email ou mot de passe incorrect");
        assert!(!h.state.tokens.is_logged_in().await);
    }
}
