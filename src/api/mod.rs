//! crmdesk HTTP Server
//!
//! Serves the built frontend bundle and the CRM JSON API, built with Axum.
//!
//! # Endpoints
//!
//! ## Health
//! - `GET /api/health` - Liveness check
//! - `GET /api/v1/status` - Uptime and record counts
//!
//! ## Customers
//! - `GET|POST /api/v1/customers`
//! - `GET|PUT|DELETE /api/v1/customers/:id`
//! - `POST /api/v1/customers/:id/tags`, `DELETE /api/v1/customers/:id/tags/:tag`
//! - `GET /api/v1/customers/export`, `POST /api/v1/customers/import`
//!
//! ## Messaging instances
//! - `GET|POST /api/v1/instances`
//! - `GET|DELETE /api/v1/instances/:id`
//! - `POST /api/v1/instances/:id/connect`, `GET /api/v1/instances/:id/status`
//! - `POST /api/v1/instances/:id/logout`, `POST /api/v1/instances/:id/messages`
//! - `POST /api/v1/webhooks/evolution`
//!
//! ## Workflows
//! - `GET /api/v1/workflows`, `POST /api/v1/workflows/trigger`
//! - `GET|POST|DELETE /api/v1/workflows/logs`, `GET /api/v1/workflows/logs/summary`
//!
//! ## Settings and documents
//! - `GET|PUT /api/v1/settings/notifications`
//! - `POST /api/v1/settings/notifications/:key/toggle`
//! - `GET|PUT|DELETE /api/v1/settings/evolution`
//! - `GET /api/v1/documents`, `GET|PUT|DELETE /api/v1/documents/:key`
//!
//! ## Aggregates
//! - `GET /api/v1/dashboard`, `GET /api/v1/reports/customers`
//! - `GET /api/v1/integrations`, `GET /api/v1/client-config`
//!
//! ## WebSocket
//! - `GET /ws` - Live events
//!
//! Every other path is served from the static directory; paths that match
//! no file get the index document so client-side routing can take over.
//!
//! # Example
//!
//! ```rust,no_run
//! use crmdesk::api::{serve, AppState};
//! use crmdesk::config::Config;
//! use crmdesk::storage::CrmStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let store = Arc::new(CrmStore::open(config.storage.store_config()).await?);
//!
//!     serve(AppState::new(store, config)).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Largest accepted request body (CSV imports included)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the router with all routes, the static fallback and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(routes::health::status))
        // Customer routes
        .route(
            "/customers",
            get(routes::customers::list_customers).post(routes::customers::create_customer),
        )
        .route("/customers/export", get(routes::customers::export_csv))
        .route("/customers/import", post(routes::customers::import_csv))
        .route(
            "/customers/:id",
            get(routes::customers::get_customer)
                .put(routes::customers::update_customer)
                .delete(routes::customers::delete_customer),
        )
        .route("/customers/:id/tags", post(routes::customers::add_tag))
        .route("/customers/:id/tags/:tag", delete(routes::customers::remove_tag))
        // Instance routes
        .route(
            "/instances",
            get(routes::instances::list_instances).post(routes::instances::create_instance),
        )
        .route(
            "/instances/:id",
            get(routes::instances::get_instance).delete(routes::instances::delete_instance),
        )
        .route("/instances/:id/connect", post(routes::instances::connect_instance))
        .route("/instances/:id/status", get(routes::instances::refresh_status))
        .route("/instances/:id/logout", post(routes::instances::logout_instance))
        .route("/instances/:id/messages", post(routes::instances::send_message))
        .route("/webhooks/evolution", post(routes::instances::evolution_webhook))
        // Workflow routes
        .route("/workflows", get(routes::workflows::list_workflows))
        .route("/workflows/trigger", post(routes::workflows::trigger_workflow))
        .route(
            "/workflows/logs",
            get(routes::workflows::list_logs)
                .post(routes::workflows::append_log)
                .delete(routes::workflows::clear_logs),
        )
        .route("/workflows/logs/summary", get(routes::workflows::log_summary))
        // Settings routes
        .route(
            "/settings/notifications",
            get(routes::settings::get_notifications).put(routes::settings::put_notifications),
        )
        .route(
            "/settings/notifications/:key/toggle",
            post(routes::settings::toggle_notification),
        )
        .route(
            "/settings/evolution",
            get(routes::settings::get_gateway)
                .put(routes::settings::put_gateway)
                .delete(routes::settings::reset_gateway),
        )
        // Document routes
        .route("/documents", get(routes::documents::list_documents))
        .route(
            "/documents/:key",
            get(routes::documents::get_document)
                .put(routes::documents::put_document)
                .delete(routes::documents::delete_document),
        )
        // Aggregates
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/reports/customers", get(routes::dashboard::customer_report))
        .route("/integrations", get(routes::dashboard::integrations))
        .route("/client-config", get(routes::dashboard::client_config))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let server = &state.config.server;
    let static_files = ServeDir::new(server.static_path())
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(server.index_path()));
    let cors = cors_layer(server);
    let timeout = TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs));

    tracing::debug!(static_dir = %server.static_dir, "Serving static bundle");

    let shared_state = Arc::new(state);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .nest("/api/v1", api_routes)
        .route("/ws", get(websocket_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive when no origins are configured
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.server.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("crmdesk listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("crmdesk shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::{CrmStore, Instance, InstanceStatus};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const INDEX_HTML: &str = "<!doctype html><div id=\"root\"></div>";

    struct TestApp {
        router: Router,
        store: Arc<CrmStore>,
        _data: TempDir,
        _static: TempDir,
    }

    async fn create_test_app() -> TestApp {
        // Nothing listens on the discard port
        create_test_app_with_gateway("http://127.0.0.1:9").await
    }

    /// Serve `gateway` on a local port, returning its base URL
    async fn spawn_gateway(gateway: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, gateway).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn create_test_app_with_gateway(gateway_url: &str) -> TestApp {
        let data = tempfile::tempdir().unwrap();
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), INDEX_HTML).unwrap();
        std::fs::create_dir(static_dir.path().join("assets")).unwrap();
        std::fs::write(static_dir.path().join("assets/app.js"), "console.log(1)").unwrap();

        let mut config = Config::default();
        config.server.static_dir = static_dir.path().to_string_lossy().to_string();
        config.storage.data_dir = data.path().to_string_lossy().to_string();
        config.evolution.url = gateway_url.to_string();
        config.evolution.api_key = "test-key".to_string();
        config.evolution.request_timeout_ms = 2_000;

        let store = Arc::new(
            CrmStore::open(config.storage.store_config())
                .await
                .unwrap()
                .with_gateway_default(config.evolution.gateway_defaults()),
        );
        let router = build_router(AppState::new(Arc::clone(&store), config));

        TestApp {
            router,
            store,
            _data: data,
            _static: static_dir,
        }
    }

    impl TestApp {
        async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
            let mut builder = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            self.router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap()
        }

        async fn raw(&self, method: &str, uri: &str, body: &str) -> Response {
            self.router
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .header(header::CONTENT_TYPE, "text/plain")
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap()
        }
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_str(&text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_api_health() {
        let app = create_test_app().await;

        let response = app.call("GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "OK");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_static_asset_served() {
        let app = create_test_app().await;

        let response = app.call("GET", "/assets/app.js", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "console.log(1)");
    }

    #[tokio::test]
    async fn test_unknown_paths_fall_back_to_index() {
        let app = create_test_app().await;

        for path in ["/", "/customers", "/settings/whatsapp", "/api/v1/nope"] {
            let response = app.call("GET", path, None).await;
            assert_eq!(response.status(), StatusCode::OK, "path {}", path);
            assert_eq!(text(response).await, INDEX_HTML, "path {}", path);
        }
    }

    #[tokio::test]
    async fn test_customer_lifecycle() {
        let app = create_test_app().await;

        let response = app
            .call(
                "POST",
                "/api/v1/customers",
                Some(json!({
                    "name": "Ana Lima",
                    "phone": "+55 11 98888-7777",
                    "email": "ana@example.com",
                    "status": "active",
                    "tags": ["vip"]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .call(
                "POST",
                &format!("/api/v1/customers/{}/tags", id),
                Some(json!({"tag": "lead"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["tags"], json!(["vip", "lead"]));

        let response = app
            .call("DELETE", &format!("/api/v1/customers/{}/tags/vip", id), None)
            .await;
        assert_eq!(json_body(response).await["tags"], json!(["lead"]));

        let response = app.call("GET", "/api/v1/customers?tag=lead", None).await;
        assert_eq!(json_body(response).await["total"], 1);

        let response = app.call("GET", "/api/v1/customers?status=inactive", None).await;
        assert_eq!(json_body(response).await["total"], 0);

        let response = app
            .call("DELETE", &format!("/api/v1/customers/{}", id), None)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.call("GET", &format!("/api/v1/customers/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_customer_requires_phone() {
        let app = create_test_app().await;

        let response = app
            .call("POST", "/api/v1/customers", Some(json!({"name": "Ana", "phone": ""})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());
        assert_eq!(app.store.list_customers(&Default::default()).await.len(), 0);
    }

    #[tokio::test]
    async fn test_csv_import_and_export() {
        let app = create_test_app().await;

        let csv = "name,phone,status,tags\nAna,+5511,active,vip;lead\nBruno,,prospect,\nCarla,+5522,bogus,\n";
        let response = app.raw("POST", "/api/v1/customers/import", csv).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["imported"], 1);
        assert_eq!(body["rejected"], 2);
        assert_eq!(body["status"], "partial");

        let response = app.call("GET", "/api/v1/customers/export", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let exported = text(response).await;
        assert!(exported.contains("Ana"));
        assert!(exported.contains("vip;lead"));
    }

    #[tokio::test]
    async fn test_notification_toggle() {
        let app = create_test_app().await;

        let response = app.call("GET", "/api/v1/settings/notifications", None).await;
        let before = json_body(response).await;
        assert_eq!(before["payment_reminders"], false);

        let response = app
            .call("POST", "/api/v1/settings/notifications/payment_reminders/toggle", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let after = json_body(response).await;
        assert_eq!(after["payment_reminders"], true);
        assert_eq!(after["email_notifications"], before["email_notifications"]);

        let response = app
            .call("POST", "/api/v1/settings/notifications/sms/toggle", None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_gateway_settings_round_trip() {
        let app = create_test_app().await;

        let response = app.call("GET", "/api/v1/settings/evolution", None).await;
        let body = json_body(response).await;
        assert_eq!(body["baseUrl"], "http://127.0.0.1:9");

        let saved = json!({
            "baseUrl": "https://gw.example.com",
            "apiKey": "secret",
            "instanceName": "sales",
            "webhookUrl": ""
        });
        let response = app
            .call("PUT", "/api/v1/settings/evolution", Some(saved.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Stored under the well-known document key as JSON text
        let response = app.call("GET", "/api/v1/documents/evolution-api-config", None).await;
        let stored: Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(stored, saved);

        let response = app
            .call(
                "PUT",
                "/api/v1/settings/evolution",
                Some(json!({"baseUrl": "ftp://nope", "apiKey": "", "instanceName": "x"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.call("DELETE", "/api/v1/settings/evolution", None).await;
        assert_eq!(json_body(response).await["baseUrl"], "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_malformed_gateway_document_falls_back() {
        let app = create_test_app().await;

        let response = app
            .raw("PUT", "/api/v1/documents/evolution-api-config", "{not json")
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.call("GET", "/api/v1/settings/evolution", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["instanceName"], "crm-whatsapp");
    }

    #[tokio::test]
    async fn test_documents_last_write_wins() {
        let app = create_test_app().await;

        app.raw("PUT", "/api/v1/documents/theme", "light").await;
        app.raw("PUT", "/api/v1/documents/theme", "dark").await;

        let response = app.call("GET", "/api/v1/documents/theme", None).await;
        assert_eq!(text(response).await, "dark");

        let response = app.call("DELETE", "/api/v1/documents/theme", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.call("GET", "/api/v1/documents/theme", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_workflow_logs() {
        let app = create_test_app().await;

        for (level, workflow) in [("info", "welcome"), ("error", "welcome"), ("success", "billing")] {
            let response = app
                .call(
                    "POST",
                    "/api/v1/workflows/logs",
                    Some(json!({
                        "level": level,
                        "workflow": workflow,
                        "message": format!("{} ran", workflow),
                        "duration_ms": 100
                    })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .call("GET", "/api/v1/workflows/logs?workflow=welcome&level=error", None)
            .await;
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["entries"][0]["level"], "error");

        let response = app.call("GET", "/api/v1/workflows/logs/summary", None).await;
        let summary = json_body(response).await;
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["average_duration_ms"], 100);

        let response = app.call("DELETE", "/api/v1/workflows/logs", None).await;
        assert_eq!(json_body(response).await["removed"], 3);
    }

    #[tokio::test]
    async fn test_append_log_rejects_blank_message() {
        let app = create_test_app().await;
        let response = app
            .call(
                "POST",
                "/api/v1/workflows/logs",
                Some(json!({"level": "info", "workflow": "welcome", "message": "  "})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_append_log_rejects_huge_duration() {
        let app = create_test_app().await;

        for _ in 0..2 {
            let response = app
                .call(
                    "POST",
                    "/api/v1/workflows/logs",
                    Some(json!({
                        "level": "info",
                        "workflow": "import",
                        "message": "stuck",
                        "duration_ms": u64::MAX
                    })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app.call("GET", "/api/v1/workflows/logs/summary", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["total"], 0);
    }

    #[tokio::test]
    async fn test_garbled_gateway_reply_is_bad_gateway() {
        let gateway = Router::new().fallback(|| async {
            axum::response::Html("<html><body>502 from proxy</body></html>")
        });
        let app = create_test_app_with_gateway(&spawn_gateway(gateway).await).await;
        app.store
            .register_instance(Instance::new("sales", None).unwrap())
            .await
            .unwrap();

        let response = app.call("POST", "/api/v1/instances/sales/connect", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "UPSTREAM_ERROR");

        let instance = app.store.get_instance("sales").await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_create_instance_gateway_down() {
        let app = create_test_app().await;

        let response = app
            .call("POST", "/api/v1/instances", Some(json!({"name": "sales"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "UPSTREAM_ERROR");
        assert!(!app.store.has_instance("sales").await);

        let response = app
            .call("POST", "/api/v1/instances", Some(json!({"name": "bad name!"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_updates_instance() {
        let app = create_test_app().await;
        app.store
            .register_instance(Instance::new("sales", None).unwrap())
            .await
            .unwrap();

        let response = app
            .call(
                "POST",
                "/api/v1/webhooks/evolution",
                Some(json!({
                    "event": "qrcode.updated",
                    "instance": "sales",
                    "data": {"qrcode": {"base64": "data:image/png;base64,QR"}}
                })),
            )
            .await;
        assert_eq!(json_body(response).await["applied"], true);
        let instance = app.store.get_instance("sales").await.unwrap();
        assert_eq!(instance.status, InstanceStatus::QrReady);

        let response = app
            .call(
                "POST",
                "/api/v1/webhooks/evolution",
                Some(json!({
                    "event": "CONNECTION_UPDATE",
                    "instance": "sales",
                    "data": {"state": "open", "wuid": "5511999@s.whatsapp.net"}
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.call("GET", "/api/v1/instances/sales", None).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "connected");
        assert_eq!(body["phone_number"], "5511999");
        assert!(body["qr_code"].is_null());

        let response = app
            .call(
                "POST",
                "/api/v1/webhooks/evolution",
                Some(json!({"event": "connection.update", "instance": "ghost", "data": {"state": "open"}})),
            )
            .await;
        assert_eq!(json_body(response).await["applied"], false);
    }

    #[tokio::test]
    async fn test_dashboard_and_report() {
        let app = create_test_app().await;

        for (name, source) in [("Ana", "instagram"), ("Bruno", "referral"), ("Carla", "instagram")] {
            app.call(
                "POST",
                "/api/v1/customers",
                Some(json!({"name": name, "phone": "+55", "source": source})),
            )
            .await;
        }

        let response = app.call("GET", "/api/v1/dashboard", None).await;
        let body = json_body(response).await;
        assert_eq!(body["total_customers"], 3);
        assert_eq!(body["customers_by_status"]["prospect"], 3);
        assert_eq!(body["recent_customers"].as_array().unwrap().len(), 3);

        let response = app.call("GET", "/api/v1/reports/customers", None).await;
        let body = json_body(response).await;
        assert_eq!(body["by_source"]["instagram"], 2);
        assert_eq!(body["by_agent"]["unassigned"], 3);
    }

    #[tokio::test]
    async fn test_client_config_exposes_public_values() {
        let app = create_test_app().await;

        let response = app.call("GET", "/api/v1/client-config", None).await;
        let body = json_body(response).await;
        assert_eq!(body["instanceName"], "crm-whatsapp");
        assert!(body.get("apiKey").is_none());
    }
}
