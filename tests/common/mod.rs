//! Shared helpers for the proxy and retry integration tests.

#![allow(dead_code)]

use desa_bridge::config::ProxyConfig;
use desa_bridge::http::{router, AppState};
use desa_bridge::{ResilientClient, RetryPolicy};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Backend that answers the n-th request with the n-th `(status, body)` pair.
/// Once the script runs out the last entry is repeated.
pub struct ScriptedBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub async fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let script = Arc::new(script);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script[index.min(script.len() - 1)];

                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let _ = socket.read(&mut buf).await;

                    let status_text = match status {
                        200 => "200 OK",
                        404 => "404 Not Found",
                        500 => "500 Internal Server Error",
                        502 => "502 Bad Gateway",
                        503 => "503 Service Unavailable",
                        _ => "200 OK",
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_text,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(20),
        attempt_timeout: Duration::from_secs(2),
    }
}

pub fn proxy_config(routes: &[(&str, String)]) -> ProxyConfig {
    let routes: BTreeMap<String, String> = routes
        .iter()
        .map(|(name, url)| (name.to_string(), url.clone()))
        .collect();
    ProxyConfig {
        routes,
        ..ProxyConfig::default()
    }
}

/// 在隨機埠上啟動代理，回傳其 base URL
pub async fn start_proxy(config: ProxyConfig, policy: RetryPolicy) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(ResilientClient::new(policy), Arc::new(config));

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    format!("http://{}", addr)
}
