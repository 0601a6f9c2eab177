//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode, Uri},
    Router,
};
use matrix_push_gateway::config::{GatewayConfig, MatrixConfig};
use matrix_push_gateway::http::GatewayServer;
use matrix_push_gateway::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A request seen by the mock push endpoint.
#[derive(Debug, Clone)]
pub struct Captured {
    pub uri: String,
    pub pushkey_header: Option<String>,
    pub body: Bytes,
}

/// Start a mock push endpoint answering `status` and recording every request.
pub async fn start_capturing_backend(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let sink = captured.clone();
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(Captured {
                uri: uri.to_string(),
                pushkey_header: headers
                    .get("x-matrix-pushkey")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body,
            });
            status
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, captured)
}

/// A running gateway bound to an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
    pub config_tx: mpsc::UnboundedSender<MatrixConfig>,
}

pub async fn start_gateway(mut config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = GatewayServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        addr,
        shutdown,
        handle,
        config_tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn matrix_body(pushkey: &str) -> String {
    format!(
        r##"{{"notification":{{"content":{{"body":"I'm floating in a most peculiar way.","msgtype":"m.text"}},"counts":{{"missed_calls":1,"unread":2}},"devices":[{{"app_id":"org.matrix.matrixConsole.ios","data":{{}},"pushkey":"{pushkey}","pushkey_ts":12345678,"tweaks":{{"sound":"bing"}}}}],"event_id":"$3957tyerfgewrf384","prio":"high","room_alias":"#exampleroom:matrix.org","room_id":"!slw48wfj34rtnrf:example.com","room_name":"Mission Control","sender":"@exampleuser:matrix.org","sender_display_name":"Major Tom","type":"m.room.message"}}}}"##
    )
}
