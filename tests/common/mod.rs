#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use cam_recon::external::{
    Absent, BruteResolver, Capability, ContentTypeDetector, HttpFingerprinter, PassiveEnumerator,
    StreamProber, Toolbox,
};
use cam_recon::http_client::{client_builder, HttpClients};
use cam_recon::ReconError;

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A canned-response HTTP/1.1 server. Unknown paths answer 404.
pub struct TestServer {
    pub addr: SocketAddr,
    /// `(method, path)` of every request received
    pub requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(p, status, body)| (p.to_string(), Route { status, body }))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, routes, log).await;
                });
            }
        });
        Self { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, Route>>,
    log: Arc<Mutex<Vec<(String, String)>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 64 * 1024 {
            return Ok(());
        }
    }
    let head = String::from_utf8_lossy(&buf).to_string();
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/").to_string();
    log.lock().unwrap().push((method.clone(), path.clone()));

    let route = routes.get(&path).cloned().unwrap_or(Route { status: 404, body: b"not found".to_vec() });
    let header = format!(
        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        route.status,
        route.body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    if method != "HEAD" {
        // ignores Range on purpose, like many embedded servers
        let _ = stream.write_all(&route.body).await;
    }
    let _ = stream.shutdown().await;
    Ok(())
}

/// Clients whose DNS maps each of `hosts` to 127.0.0.1.
pub fn clients_resolving(hosts: &[&str], addr: SocketAddr) -> HttpClients {
    let timeout = Duration::from_secs(5);
    let mut fetch = client_builder(timeout, true);
    let mut probe = client_builder(timeout, false).no_gzip().no_brotli();
    for h in hosts {
        fetch = fetch.resolve(h, addr);
        probe = probe.resolve(h, addr);
    }
    HttpClients { fetch: fetch.build().unwrap(), probe: probe.build().unwrap() }
}

pub struct FixedPassive(pub Vec<String>);

impl Capability for FixedPassive {
    fn name(&self) -> &str { "fixed-passive" }
    fn available(&self) -> bool { true }
}

#[async_trait]
impl PassiveEnumerator for FixedPassive {
    async fn enumerate(&self, _domain: &str) -> Result<Vec<String>, ReconError> {
        Ok(self.0.clone())
    }
}

/// Reports every host live on `port` over plain HTTP, httpx style.
pub struct FixedFingerprinter {
    pub port: u16,
}

impl Capability for FixedFingerprinter {
    fn name(&self) -> &str { "fixed-fingerprinter" }
    fn available(&self) -> bool { true }
}

#[async_trait]
impl HttpFingerprinter for FixedFingerprinter {
    async fn fingerprint(&self, hosts: &[String], _ports: &[u16]) -> Result<Vec<String>, ReconError> {
        Ok(hosts.iter().map(|h| format!("http://{}:{} [200] [Camera]", h, self.port)).collect())
    }
}

/// Accepts every stream and remembers what it was asked.
#[derive(Default)]
pub struct RecordingProber {
    pub seen: Mutex<Vec<String>>,
}

impl Capability for RecordingProber {
    fn name(&self) -> &str { "recording-prober" }
    fn available(&self) -> bool { true }
}

#[async_trait]
impl StreamProber for RecordingProber {
    async fn probe(&self, url: &str, _limit: Duration) -> Result<bool, ReconError> {
        self.seen.lock().unwrap().push(url.to_string());
        Ok(true)
    }
}

pub struct FixedType(pub &'static str);

impl Capability for FixedType {
    fn name(&self) -> &str { "fixed-type" }
    fn available(&self) -> bool { true }
}

#[async_trait]
impl ContentTypeDetector for FixedType {
    async fn detect(&self, _sample: &std::path::Path) -> Result<String, ReconError> {
        Ok(self.0.to_string())
    }
}

/// Absent tools except for the ones a test overrides.
pub fn toolbox(
    passive: Option<Arc<dyn PassiveEnumerator>>,
    fingerprinter: Option<Arc<dyn HttpFingerprinter>>,
    prober: Option<Arc<dyn StreamProber>>,
    detector: Option<Arc<dyn ContentTypeDetector>>,
) -> Toolbox {
    let brute: Arc<dyn BruteResolver> = Arc::new(Absent("dnsx"));
    Toolbox {
        passive: passive.unwrap_or_else(|| Arc::new(Absent("subfinder"))),
        brute,
        fingerprinter: fingerprinter.unwrap_or_else(|| Arc::new(Absent("httpx"))),
        stream_prober: prober.unwrap_or_else(|| Arc::new(Absent("ffprobe"))),
        type_detector: detector.unwrap_or_else(|| Arc::new(Absent("file"))),
    }
}
