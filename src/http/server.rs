//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, visitor limit)
//! - Serve on a listener until shutdown
//! - Apply hot-reloaded Matrix settings
//! - Periodically forget idle visitors

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, MatrixConfig};
use crate::forward::{ForwardError, Forwarder, HttpForwarder};
use crate::http::handlers::{discovery_handler, health_handler, notify_handler};
use crate::http::request::{MakeRequestUuidV4, RequestIdExt};
use crate::matrix::NOTIFY_PATH;
use crate::security::visitor::{visitor_limit_middleware, VisitorLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub matrix: Arc<ArcSwap<MatrixConfig>>,
    pub visitors: Arc<VisitorLimiter>,
    pub forwarder: Arc<dyn Forwarder>,
}

/// HTTP server for the Matrix push gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    matrix: Arc<ArcSwap<MatrixConfig>>,
    visitors: Arc<VisitorLimiter>,
}

impl GatewayServer {
    /// Create a server forwarding over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, ForwardError> {
        let forwarder = Arc::new(HttpForwarder::new(&config.forward)?);
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server with a custom forwarder.
    pub fn with_forwarder(config: GatewayConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        let matrix = Arc::new(ArcSwap::from_pointee(config.gateway.clone()));
        let visitors = Arc::new(VisitorLimiter::new(config.visitor.clone()));
        let state = AppState {
            matrix: matrix.clone(),
            visitors: visitors.clone(),
            forwarder,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            matrix,
            visitors,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let limiter = middleware::from_fn_with_state(state.visitors.clone(), visitor_limit_middleware);

        Router::new()
            .route(
                NOTIFY_PATH,
                get(discovery_handler).post(notify_handler).route_layer(limiter),
            )
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Router with all layers, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live Matrix settings.
    pub fn matrix_config(&self) -> Arc<ArcSwap<MatrixConfig>> {
        self.matrix.clone()
    }

    /// Handle to the per-visitor limiter.
    pub fn visitors(&self) -> Arc<VisitorLimiter> {
        self.visitors.clone()
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, applying Matrix settings as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<MatrixConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_url = %self.config.gateway.base_url,
            max_length = self.config.gateway.max_length,
            "HTTP server starting"
        );

        let matrix = self.matrix.clone();
        let reloader = tokio::spawn(async move {
            while let Some(settings) = config_updates.recv().await {
                apply_config(&matrix, settings);
            }
        });

        let idle_for = Duration::from_secs(self.config.visitor.eviction_interval_secs.max(1));
        let evictor = tokio::spawn(evict_idle_visitors(self.visitors.clone(), idle_for));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        evictor.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Publish `settings` to subsequent requests.
pub fn apply_config(matrix: &ArcSwap<MatrixConfig>, settings: MatrixConfig) {
    let current = matrix.load();
    if **current == settings {
        tracing::debug!("Matrix settings unchanged");
        return;
    }
    tracing::info!(
        old_base_url = %current.base_url,
        new_base_url = %settings.base_url,
        max_length = settings.max_length,
        "Applying reloaded Matrix settings"
    );
    matrix.store(Arc::new(settings));
}

/// Every `every`, drop visitors that have been idle that long with a full bucket.
async fn evict_idle_visitors(visitors: Arc<VisitorLimiter>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let evicted = visitors.evict_idle(every);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = visitors.tracked(), "Evicted idle visitors");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::OutgoingRequest;
    use async_trait::async_trait;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Method, StatusCode};
    use axum::response::Response;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingForwarder {
        sent: Mutex<Vec<OutgoingRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        async fn forward(&self, request: OutgoingRequest) -> Result<(), ForwardError> {
            self.sent.lock().unwrap().push(request);
            if self.fail {
                Err(ForwardError::Status(StatusCode::NOT_FOUND))
            } else {
                Ok(())
            }
        }
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.gateway.base_url = "https://push.example.com".to_string();
        config
    }

    fn app(server: &GatewayServer) -> Router {
        let addr: SocketAddr = "10.1.2.3:4567".parse().unwrap();
        server.router().layer(MockConnectInfo(addr))
    }

    fn push_body(pushkey: &str) -> String {
        format!(r#"{{"notification":{{"devices":[{{"app_id":"org.example","pushkey":"{pushkey}"}}]}}}}"#)
    }

    fn notify(body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(NOTIFY_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn discovery_route() {
        let server = GatewayServer::with_forwarder(config(), Arc::new(RecordingForwarder::default()));
        let response = app(&server)
            .oneshot(Request::builder().uri(NOTIFY_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, "{\"unifiedpush\":{\"gateway\":\"matrix\"}}\n");
    }

    #[tokio::test]
    async fn forwards_matching_push() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let server = GatewayServer::with_forwarder(config(), forwarder.clone());
        let body = push_body("https://push.example.com/up123?up=1");

        let response = app(&server).oneshot(notify(body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "{\"rejected\":[]}\n");

        let sent = forwarder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target(), "https://push.example.com/up123?up=1");
        assert_eq!(sent[0].body().as_ref(), body.as_bytes());
    }

    #[tokio::test]
    async fn rejects_foreign_pushkey_with_200() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let server = GatewayServer::with_forwarder(config(), forwarder.clone());

        let response = app(&server)
            .oneshot(notify(push_body("https://evil.example.org/up")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "{\"rejected\":[\"https://evil.example.org/up\"]}\n"
        );
        assert!(forwarder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let server = GatewayServer::with_forwarder(config(), Arc::new(RecordingForwarder::default()));
        let response = app(&server)
            .oneshot(notify("this is not json".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], 40019);
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let mut cfg = config();
        cfg.gateway.max_length = 16;
        let server = GatewayServer::with_forwarder(cfg, Arc::new(RecordingForwarder::default()));

        let response = app(&server)
            .oneshot(notify(push_body("https://push.example.com/up1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn forward_failure_is_bad_gateway() {
        let forwarder = Arc::new(RecordingForwarder {
            fail: true,
            ..Default::default()
        });
        let server = GatewayServer::with_forwarder(config(), forwarder);

        let response = app(&server)
            .oneshot(notify(push_body("https://push.example.com/up1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn repeated_rejections_get_throttled() {
        let mut cfg = config();
        cfg.visitor.requests_per_second = 1;
        cfg.visitor.burst_size = 3;
        cfg.visitor.rejection_cost = 2;
        let server = GatewayServer::with_forwarder(cfg, Arc::new(RecordingForwarder::default()));
        let router = app(&server);

        let first = router
            .clone()
            .oneshot(notify(push_body("https://evil.example.org/up")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router
            .oneshot(notify(push_body("https://push.example.com/up1")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn reload_changes_base_url() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let server = GatewayServer::with_forwarder(config(), forwarder.clone());

        let mut reloaded = config();
        reloaded.gateway.base_url = "https://new.example.com".to_string();
        apply_config(&server.matrix_config(), reloaded.gateway);

        let response = app(&server)
            .oneshot(notify(push_body("https://push.example.com/up1")))
            .await
            .unwrap();
        assert_eq!(
            body_string(response).await,
            "{\"rejected\":[\"https://push.example.com/up1\"]}\n"
        );

        let response = app(&server)
            .oneshot(notify(push_body("https://new.example.com/up1")))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "{\"rejected\":[]}\n");
        assert_eq!(forwarder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refuses_pushkey_pointing_at_notify_route() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let server = GatewayServer::with_forwarder(config(), forwarder.clone());

        let response = app(&server)
            .oneshot(notify(push_body("https://push.example.com/_matrix/push/v1/notify")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(forwarder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookalike_host_is_rejected_not_forwarded() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let server = GatewayServer::with_forwarder(config(), forwarder.clone());

        let response = app(&server)
            .oneshot(notify(push_body("https://push.example.com.evil.org/up")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "{\"rejected\":[\"https://push.example.com.evil.org/up\"]}\n"
        );
        assert!(forwarder.sent.lock().unwrap().is_empty());
        assert_eq!(server.visitors().rejections("10.1.2.3".parse().unwrap()), 1);
    }

    #[tokio::test]
    async fn evictor_forgets_idle_visitors() {
        let mut cfg = config();
        cfg.visitor.requests_per_second = 1000;
        cfg.visitor.burst_size = 1;
        let visitors = Arc::new(VisitorLimiter::new(cfg.visitor.clone()));
        assert!(visitors.check("10.0.0.1".parse().unwrap()));

        let task = tokio::spawn(evict_idle_visitors(visitors.clone(), Duration::from_millis(5)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(visitors.tracked(), 0);
    }

    #[tokio::test]
    async fn health_route() {
        let server = GatewayServer::with_forwarder(config(), Arc::new(RecordingForwarder::default()));
        let response = app(&server)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
