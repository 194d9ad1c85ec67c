use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{NetworkKind, ReconError};

/// Body of a GET, truncated to the caller's cap.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub truncated: bool,
}

/// Status code of a HEAD request. Nothing is downloaded.
pub async fn head_status(client: &Client, url: &str, timeout: Duration) -> Result<u16, ReconError> {
    let resp = tokio::time::timeout(timeout, client.head(url).timeout(timeout).send())
        .await
        .map_err(|_| timeout_error(url))?
        .map_err(|e| ReconError::network(url, &e))?;
    Ok(resp.status().as_u16())
}

/// GET a page (redirects follow the client's policy), keeping at most `cap` bytes.
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration, cap: usize) -> Result<Fetched, ReconError> {
    let request = client.get(url).timeout(timeout);
    fetch_capped(request, url, timeout, cap).await
}

/// GET the first `cap` bytes of a resource.
///
/// Asks for a byte range, and truncates locally as well since plenty of
/// embedded servers ignore `Range`.
pub async fn fetch_sample(client: &Client, url: &str, timeout: Duration, cap: usize) -> Result<Fetched, ReconError> {
    let last = cap.saturating_sub(1);
    let request = client
        .get(url)
        .timeout(timeout)
        .header(reqwest::header::RANGE, format!("bytes=0-{}", last));
    fetch_capped(request, url, timeout, cap).await
}

async fn fetch_capped(request: reqwest::RequestBuilder, url: &str, timeout: Duration, cap: usize) -> Result<Fetched, ReconError> {
    let work = async {
        let resp = request.send().await.map_err(|e| ReconError::network(url, &e))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let (body, truncated) = read_capped(resp, cap).await.map_err(|e| ReconError::network(url, &e))?;
        Ok::<_, ReconError>(Fetched { status, content_type, body, truncated })
    };
    tokio::time::timeout(timeout, work).await.map_err(|_| timeout_error(url))?
}

/// Read the body chunk by chunk and stop once `cap` bytes are held.
async fn read_capped(mut resp: Response, cap: usize) -> reqwest::Result<(Vec<u8>, bool)> {
    let mut body = Vec::with_capacity(cap.min(64 * 1024));
    while let Some(chunk) = resp.chunk().await? {
        let room = cap - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, chunk.len() > room));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

fn timeout_error(url: &str) -> ReconError {
    ReconError::Network { url: url.to_string(), kind: NetworkKind::Timeout }
}

/// Join a base URL and a catalog path with exactly one slash.
pub fn join_path(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
