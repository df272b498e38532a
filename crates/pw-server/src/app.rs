//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(handlers::generate::generate_page))
        .route(
            "/page",
            get(handlers::pages::get_page).delete(handlers::pages::delete_page),
        )
        .route("/pages", get(handlers::pages::list_pages))
        .route("/health", get(handlers::health::get_health))
        .route("/view", get(handlers::view::view_page))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::cors_layer())
                .layer(security::content_type_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use pw_generator::{GenerationInvoker, GenerationSettings, ScriptedProvider};
    use pw_pages::{PageService, PromptComposer};
    use async_trait::async_trait;
    use pw_storage::{BlobEntry, MemoryStorage, PutOptions, PutResult, Storage, StorageError};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const PAGE: &str = "<!DOCTYPE html><html><body>Bakery</body></html>";

    fn router(provider: ScriptedProvider) -> Router {
        router_with(provider, Duration::ZERO, Duration::from_secs(30))
    }

    fn router_with(
        provider: ScriptedProvider,
        retry_delay: Duration,
        request_timeout: Duration,
    ) -> Router {
        router_on(
            Arc::new(MemoryStorage::new()),
            provider,
            retry_delay,
            request_timeout,
        )
    }

    fn router_on(
        storage: Arc<dyn Storage>,
        provider: ScriptedProvider,
        retry_delay: Duration,
        request_timeout: Duration,
    ) -> Router {
        let settings = GenerationSettings {
            retry_delay,
            ..GenerationSettings::default()
        };
        let service = PageService::new(
            storage,
            GenerationInvoker::new(Arc::new(provider), settings),
            PromptComposer::default(),
        );
        create_router(Arc::new(AppState {
            service: Arc::new(service),
            request_timeout,
        }))
    }

    /// Memory storage whose metadata writes take `delay`.
    struct SlowMetadata {
        inner: MemoryStorage,
        delay: Duration,
    }

    #[async_trait]
    impl Storage for SlowMetadata {
        fn backend(&self) -> &'static str {
            "SlowMetadata"
        }

        async fn put(
            &self,
            key: &str,
            body: Vec<u8>,
            options: PutOptions,
        ) -> Result<PutResult, StorageError> {
            if key.starts_with("metadata/") {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.put(key, body, options).await
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.inner.get(key).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
            self.inner.delete(keys).await
        }

        async fn check(&self) -> Result<(), StorageError> {
            self.inner.check().await
        }
    }

    fn generate_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_then_read_page() {
        let app = router(ScriptedProvider::new().then_text(format!("Here you go: {PAGE}")));

        let response = app
            .clone()
            .oneshot(generate_request(
                &json!({"pageName": "Bakery Home", "instructions": "A bakery homepage"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({
                "success": true,
                "canonicalKey": "bakery_home",
                "publicUrl": "memory://pages/bakery_home.html",
                "viewUrl": "/view?page=bakery_home",
                "body": PAGE,
                "created": true,
            })
        );

        let response = app
            .oneshot(request(Method::GET, "/page?name=bakery_home"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["htmlContent"], PAGE);
        assert_eq!(body["metadata"]["name"], "bakery_home");
        assert_eq!(body["metadata"]["title"], "Bakery Home");
    }

    #[tokio::test]
    async fn test_generate_page_type_reaches_prompt() {
        let provider = Arc::new(ScriptedProvider::new().then_text(PAGE));
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let service = PageService::new(
            storage,
            GenerationInvoker::new(Arc::clone(&provider) as _, GenerationSettings::default()),
            PromptComposer::default(),
        );
        let app = create_router(Arc::new(AppState {
            service: Arc::new(service),
            request_timeout: Duration::from_secs(30),
        }));

        let response = app
            .oneshot(generate_request(
                &json!({"pageName": "menu", "instructions": "x", "pageType": "restaurant menu"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let requests = provider.requests();
        assert!(requests[0].prompt.contains("responsive restaurant menu page"));
    }

    #[tokio::test]
    async fn test_generate_missing_instructions_is_bad_request() {
        let provider = ScriptedProvider::new();
        let app = router(provider);

        let response = app
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "  "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_generate_malformed_json_is_bad_request() {
        let app = router(ScriptedProvider::new());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_generate_provider_failure_is_bad_gateway() {
        let app = router(ScriptedProvider::new().then_failure(401, "invalid x-api-key"));

        let response = app
            .clone()
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["details"].as_str().unwrap().contains("invalid x-api-key"));

        let response = app.oneshot(request(Method::GET, "/pages")).await.unwrap();
        assert_eq!(json_body(response).await["pages"], json!([]));
    }

    #[tokio::test]
    async fn test_generate_overload_exhaustion_is_bad_gateway() {
        let app = router(
            ScriptedProvider::new()
                .then_overloaded()
                .then_overloaded()
                .then_overloaded(),
        );

        let response = app
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_timeout_is_gateway_timeout() {
        let app = router_with(
            ScriptedProvider::new().then_overloaded().then_text(PAGE),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        let response = app
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            json_body(response).await["error"],
            "Generation timed out after 1s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_timeout_during_publish_still_writes_metadata() {
        let storage = Arc::new(SlowMetadata {
            inner: MemoryStorage::new(),
            delay: Duration::from_secs(5),
        });
        let app = router_on(
            Arc::clone(&storage) as Arc<dyn Storage>,
            ScriptedProvider::new().then_text(PAGE),
            Duration::ZERO,
            Duration::from_secs(1),
        );

        let response = app
            .clone()
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(storage.inner.get("pages/home.html").await.unwrap(), PAGE.as_bytes());
        assert!(storage.inner.get("metadata/home.json").await.is_ok());

        let response = app.oneshot(request(Method::GET, "/health")).await.unwrap();
        assert_eq!(json_body(response).await["orphaned"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let app = router(ScriptedProvider::new());

        let response = app
            .oneshot(request(Method::GET, "/page?name=nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Page not found");
    }

    #[tokio::test]
    async fn test_page_without_name_is_bad_request() {
        let app = router(ScriptedProvider::new());

        let response = app.oneshot(request(Method::GET, "/page")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_page_from_listing() {
        let app = router(ScriptedProvider::new().then_text(PAGE));
        app.clone()
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/page?name=Home"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["canonicalKey"], "home");

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/page?name=home"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(request(Method::GET, "/pages")).await.unwrap();
        assert_eq!(json_body(response).await["pages"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_missing_page_is_not_found() {
        let app = router(ScriptedProvider::new());

        let response = app
            .oneshot(request(Method::DELETE, "/page?name=ghost"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_view_serves_html_without_caching() {
        let app = router(ScriptedProvider::new().then_text(PAGE));
        app.clone()
            .oneshot(generate_request(&json!({"pageName": "home", "instructions": "x"})))
            .await
            .unwrap();

        let response = app
            .oneshot(request(Method::GET, "/view?page=home"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, PAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_view_missing_page_is_not_found() {
        let app = router(ScriptedProvider::new());

        let response = app
            .oneshot(request(Method::GET, "/view?page=nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_memory_backend() {
        let app = router(ScriptedProvider::new());

        let response = app.oneshot(request(Method::GET, "/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "status": "ok",
                "backend": "Memory",
                "persistent": false,
                "reachable": true,
                "orphaned": [],
            })
        );
    }

    #[tokio::test]
    async fn test_responses_carry_cors_and_nosniff_headers() {
        let app = router(ScriptedProvider::new());
        let request = Request::builder()
            .uri("/pages")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
