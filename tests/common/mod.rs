//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use redirect_proxy::config::ProxyConfig;
use redirect_proxy::http::{build_upstream_client, HttpServer};
use redirect_proxy::observability::{LogSink, MemorySink, ProxyLogs};
use redirect_proxy::Shutdown;

/// A proxy running in the background for one test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy against `target`, logging into `sink`.
pub async fn start_proxy_with_sink(target: &str, sink: Arc<dyn LogSink>) -> TestProxy {
    let config = ProxyConfig {
        target_server: target.to_string(),
        ..Default::default()
    };
    let server = HttpServer::new(config, ProxyLogs::new(sink), build_upstream_client().unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// Start the proxy against `target` with an in-memory sink.
pub async fn start_proxy(target: &str) -> (TestProxy, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let proxy = start_proxy_with_sink(target, sink.clone()).await;
    (proxy, sink)
}

/// Start a backend that answers every connection with a fixed raw response.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut received = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => received.extend_from_slice(&buf[..n]),
                            }
                        }
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Echo the request line, headers and body back as plain text.
async fn echo(request: Request<Body>) -> String {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let mut out = format!("{} {}\n", parts.method, parts.uri);
    for (name, value) in parts.headers.iter() {
        out.push_str(&format!("{}: {}\n", name, value.to_str().unwrap_or("<binary>")));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(&body));
    out
}

/// Start an echo backend on `addr`.
pub async fn start_echo_backend_on(addr: SocketAddr) -> SocketAddr {
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start an echo backend on an ephemeral port.
pub async fn start_echo_backend() -> SocketAddr {
    start_echo_backend_on("127.0.0.1:0".parse().unwrap()).await
}

/// An address nothing is listening on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Start a TCP server that echoes every byte back until the peer closes.
pub async fn start_tcp_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Send `request` verbatim and return everything the server wrote back.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Client that uses the test proxy as its HTTP forward proxy.
pub fn proxied_client(proxy: &TestProxy) -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(proxy.url("")).unwrap())
        .build()
        .unwrap()
}
