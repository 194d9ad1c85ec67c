use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

pub const DEFAULT_PORTS: [u16; 6] = [80, 443, 8000, 8080, 8443, 9000];

/// Known camera / streaming API paths, relative to a live host's base URL.
pub const DEFAULT_CATALOG: [&str; 14] = [
    "snapshot.jpg",
    "snapshot.cgi",
    "cgi-bin/snapshot.cgi",
    "image.jpg",
    "video.mjpg",
    "mjpg/video.mjpg",
    "videostream.cgi",
    "axis-cgi/jpg/image.cgi",
    "axis-cgi/mjpg/video.cgi",
    "onvif/device_service",
    "live.m3u8",
    "hls/live.m3u8",
    "streaming/channels/101",
    "ISAPI/Streaming/channels/101/picture",
];

/// Substrings that mark a page as camera / media related (matched case-insensitively).
pub const DEFAULT_SIGNATURES: [&str; 14] = [
    "rtsp:",
    "m3u8",
    "snapshot",
    "mjpeg",
    "mjpg",
    "onvif",
    "/cgi-bin",
    "/streams/",
    "videostream.cgi",
    "video.cgi",
    "axis-cgi",
    "live.sdp",
    "isapi/streaming",
    "webcam",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub ports: Vec<u16>,
    /// Minimum gap between HTTP requests (classifier and endpoint tester)
    pub delay_ms: u64,
    pub stream_delay_ms: u64,
    pub timeout_secs: u64,
    pub live_timeout_secs: u64,
    pub stream_timeout_secs: u64,
    /// Upper bound for external discovery tools (subfinder, dnsx, httpx)
    pub tool_timeout_secs: u64,
    pub sample_cap: usize,
    pub page_cap: usize,
    pub brute_cap: usize,
    pub concurrency: u16,
    pub per_host: u16,
    pub verify_streams: bool,
    pub catalog: Vec<String>,
    pub signatures: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            delay_ms: 250,
            stream_delay_ms: 500,
            timeout_secs: 6,
            live_timeout_secs: 3,
            stream_timeout_secs: 8,
            tool_timeout_secs: 900,
            sample_cap: 100 * 1024,
            page_cap: 2 * 1024 * 1024,
            brute_cap: 20_000,
            concurrency: 1,
            per_host: 1,
            verify_streams: true,
            catalog: DEFAULT_CATALOG.iter().map(|s| s.to_string()).collect(),
            signatures: DEFAULT_SIGNATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanConfig {
    /// Load a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ReconError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ReconError::MalformedInput(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| ReconError::MalformedInput(format!("{}: {}", path.display(), e)))
    }

    pub fn delay(&self) -> Duration { Duration::from_millis(self.delay_ms) }
    pub fn stream_delay(&self) -> Duration { Duration::from_millis(self.stream_delay_ms) }
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
    pub fn live_timeout(&self) -> Duration { Duration::from_secs(self.live_timeout_secs) }
    pub fn stream_timeout(&self) -> Duration { Duration::from_secs(self.stream_timeout_secs) }
    pub fn tool_timeout(&self) -> Duration { Duration::from_secs(self.tool_timeout_secs) }

    /// Worker count, never below one.
    pub fn workers(&self) -> usize {
        usize::from(self.concurrency.max(1))
    }
}

/// Parse a comma separated port list such as `80,443,8080`.
pub fn parse_ports(s: &str) -> Result<Vec<u16>, ReconError> {
    let mut ports = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() { continue; }
        let port: u16 = part
            .parse()
            .map_err(|_| ReconError::MalformedInput(format!("invalid port '{}'", part)))?;
        if port == 0 {
            return Err(ReconError::MalformedInput("port 0 is not probeable".to_string()));
        }
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    if ports.is_empty() {
        return Err(ReconError::MalformedInput("empty port list".to_string()));
    }
    Ok(ports)
}

/// Read a newline-delimited list, skipping blank lines and `#` comments.
/// At most `limit` entries are returned.
pub fn read_list_file(path: &Path, limit: usize) -> Result<Vec<String>, ReconError> {
    let data = std::fs::read(path)
        .map_err(|e| ReconError::MalformedInput(format!("{}: {}", path.display(), e)))?;
    let text = String::from_utf8_lossy(&data);
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .take(limit)
        .map(str::to_string)
        .collect())
}
