//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use talk_server::{ServerConfig, Shutdown, TalkServer, TalkStore};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Config for tests: no persistence, static files from `static_root`.
pub fn test_config(static_root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.storage.enabled = false;
    config.static_files.root = static_root.to_path_buf();
    config
}

/// Build the in-process app around a fresh store.
pub fn app(config: ServerConfig) -> (Router, Arc<TalkStore>) {
    let store = Arc::new(TalkStore::default());
    let server = TalkServer::new(config, store.clone()).unwrap();
    (server.router(), store)
}

/// Send one request through the app.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn put_talk(title: &str, presenter: &str, summary: &str) -> Request<Body> {
    Request::put(format!("/talks/{title}"))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "presenter": presenter, "summary": summary }).to_string(),
        ))
        .unwrap()
}

pub fn post_comment(title: &str, author: &str, message: &str) -> Request<Body> {
    Request::post(format!("/talks/{title}/comments"))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "author": author, "message": message }).to_string(),
        ))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// A server running on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub store: Arc<TalkStore>,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn start_server(config: ServerConfig) -> RunningServer {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(TalkStore::default());
    let server = TalkServer::new(config, store.clone()).unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningServer {
        addr,
        store,
        shutdown,
        handle,
    }
}
