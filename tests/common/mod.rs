use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Once;
use std::time::Duration;

use kube_iface_bind::{InterfaceSource, ResolveError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[allow(dead_code)]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
content-type: text/plain\r\n\
content-length: 2\r\n\
connection: close\r\n\
\r\n\
ok";

static INIT: Once = Once::new();

pub fn tracing_init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Interface table with fixed contents.
#[allow(dead_code)]
#[derive(Clone, Debug, Default)]
pub struct StaticInterfaces {
    table: HashMap<String, Vec<IpAddr>>,
}

#[allow(dead_code)]
impl StaticInterfaces {
    pub fn with(name: &str, addrs: &[&str]) -> Self {
        let mut table = HashMap::new();
        table.insert(
            name.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        Self { table }
    }
}

impl InterfaceSource for StaticInterfaces {
    fn addresses(&self, name: &str) -> Result<Vec<IpAddr>, ResolveError> {
        self.table
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::InterfaceNotFound(name.to_string()))
    }
}

/// Minimal HTTP/1.1 server standing in for the API server. Answers every
/// request with `200 ok`, closes the connection, and records each peer
/// address it accepted along with the request head it read.
pub struct FakeApiServer {
    addr: SocketAddr,
    peers: mpsc::UnboundedReceiver<SocketAddr>,
    requests: mpsc::UnboundedReceiver<String>,
}

#[allow(dead_code)]
impl FakeApiServer {
    pub async fn start() -> Self {
        Self::spawn(true).await
    }

    /// Accepts connections and reads requests but never answers them.
    pub async fn silent() -> Self {
        Self::spawn(false).await
    }

    async fn spawn(answer: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (peer_tx, peers) = mpsc::unbounded_channel();
        let (request_tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                if peer_tx.send(peer).is_err() {
                    break;
                }

                tokio::spawn(respond(stream, request_tx.clone(), answer));
            }
        });

        Self {
            addr,
            peers,
            requests,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> kube::Config {
        kube::Config::new(format!("http://{}", self.addr).parse().unwrap())
    }

    pub async fn next_peer(&mut self) -> SocketAddr {
        tokio::time::timeout(DEFAULT_TIMEOUT, self.peers.recv())
            .await
            .unwrap()
            .unwrap()
    }

    /// Request line and headers of the next request, header names
    /// lowercased.
    pub async fn next_request(&mut self) -> String {
        tokio::time::timeout(DEFAULT_TIMEOUT, self.requests.recv())
            .await
            .unwrap()
            .unwrap()
    }
}

async fn respond(mut stream: TcpStream, requests: mpsc::UnboundedSender<String>, answer: bool) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };

        request.extend_from_slice(&chunk[..n]);

        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let _ = requests.send(String::from_utf8_lossy(&request).to_lowercase());

    if !answer {
        // Hold the connection open until the client gives up
        let _ = stream.read(&mut chunk).await;
        return;
    }

    let _ = stream.write_all(RESPONSE).await;
    let _ = stream.shutdown().await;
}

#[allow(dead_code)]
pub async fn get_healthz(client: &kube::Client) -> Result<String, kube::Error> {
    let request = http::Request::get("/healthz").body(Vec::new()).unwrap();
    client.request_text(request).await
}
