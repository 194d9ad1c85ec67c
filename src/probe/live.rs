//! Live-host probing: which candidates answer HTTP(S), and on which port.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::RunContext;
use crate::error::ReconError;
use crate::external::HttpFingerprinter;
use crate::output::write_jsonl;
use crate::probe::http_probe::head_status;
use crate::probe::throttle::Throttle;

static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveHost {
    /// Base URL, `scheme://host[:port]` without trailing slash
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub status: Option<u16>,
    pub title: Option<String>,
}

impl LiveHost {
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Self {
            url: base_url(scheme, host, port),
            scheme: scheme.to_string(),
            host: host.to_lowercase(),
            port,
            status: None,
            title: None,
        }
    }

    /// Parse any http(s) URL down to its base.
    pub fn from_url(raw: &str) -> Option<Self> {
        let u = Url::parse(raw).ok()?;
        if u.scheme() != "http" && u.scheme() != "https" {
            return None;
        }
        let host = u.host_str()?;
        let port = u.port_or_known_default()?;
        Some(Self::new(u.scheme(), host, port))
    }
}

/// `scheme://host[:port]`, default ports elided.
pub fn base_url(scheme: &str, host: &str, port: u16) -> String {
    let default = matches!((scheme, port), ("http", 80) | ("https", 443));
    if default {
        format!("{}://{}", scheme, host.to_lowercase())
    } else {
        format!("{}://{}:{}", scheme, host.to_lowercase(), port)
    }
}

/// Scheme used for a bare port in the fallback path.
pub fn scheme_for_port(port: u16) -> &'static str {
    if port == 443 { "https" } else { "http" }
}

/// Parse one fingerprinter line: `<url> [status] [title] ...`.
pub fn parse_fingerprint_line(line: &str) -> Option<LiveHost> {
    let mut tokens = line.split_whitespace();
    let mut host = LiveHost::from_url(tokens.next()?)?;

    let groups: Vec<&str> = BRACKETS
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()))
        .collect();
    if let Some(idx) = groups.iter().position(|g| matches!(g.parse::<u16>(), Ok(100..=599))) {
        host.status = groups[idx].parse().ok();
        host.title = groups.get(idx + 1).filter(|t| !t.is_empty()).map(|t| t.to_string());
    }
    Some(host)
}

/// Keep fingerprinter results that trace back to a candidate; first line per base URL wins.
pub fn hosts_from_fingerprints(lines: &[String], candidates: &[String]) -> Vec<LiveHost> {
    let allowed: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    let mut by_url: BTreeMap<String, LiveHost> = BTreeMap::new();
    for line in lines {
        let Some(host) = parse_fingerprint_line(line) else {
            tracing::debug!("ignoring fingerprint line: {}", line);
            continue;
        };
        if !allowed.contains(host.host.as_str()) {
            tracing::debug!("dropping {}: not a discovered candidate", host.url);
            continue;
        }
        by_url.entry(host.url.clone()).or_insert(host);
    }
    by_url.into_values().collect()
}

/// Try `ports` in order with HEAD; the first 2xx/3xx answer wins. Every
/// attempt waits its turn on `throttle`.
pub async fn probe_candidate(
    client: &Client,
    throttle: &Throttle,
    candidate: &str,
    ports: &[u16],
    timeout: Duration,
) -> Result<Option<LiveHost>, ReconError> {
    for &port in ports {
        let mut host = LiveHost::new(scheme_for_port(port), candidate, port);
        let answer = {
            let _permit = throttle.acquire(&host.host).await?;
            head_status(client, &host.url, timeout).await
        };
        match answer {
            Ok(status) if (200..400).contains(&status) => {
                host.status = Some(status);
                return Ok(Some(host));
            }
            Ok(status) => tracing::debug!("{} answered {}", host.url, status),
            Err(e) => tracing::debug!("{}", e),
        }
    }
    Ok(None)
}

/// Fallback prober: candidates one after another, ports tried in order.
pub async fn fallback_probe(
    client: &Client,
    throttle: &Throttle,
    candidates: &[String],
    ports: &[u16],
    timeout: Duration,
) -> Result<Vec<LiveHost>, ReconError> {
    let mut live = Vec::new();
    for candidate in candidates {
        if let Some(host) = probe_candidate(client, throttle, candidate, ports, timeout).await? {
            live.push(host);
        }
    }
    Ok(live)
}

/// Live hosts for the candidate set, through the fingerprinter when present.
pub async fn probe_live_hosts(
    ctx: &RunContext,
    candidates: &[String],
    ports: &[u16],
    fingerprinter: &dyn HttpFingerprinter,
    client: &Client,
    throttle: &Throttle,
    timeout: Duration,
) -> Result<Vec<LiveHost>, ReconError> {
    let mut live = if candidates.is_empty() {
        Vec::new()
    } else {
        match fingerprinter.fingerprint(candidates, ports).await {
            Ok(lines) => hosts_from_fingerprints(&lines, candidates),
            Err(e) => {
                tracing::warn!("{}; falling back to direct HEAD probes", e);
                println!("[!] {} unavailable, probing {} candidates directly", fingerprinter.name(), candidates.len());
                fallback_probe(client, throttle, candidates, ports, timeout).await?
            }
        }
    };
    live.sort_by(|a, b| a.url.cmp(&b.url));
    live.dedup_by(|a, b| a.url == b.url);

    let urls: Vec<&str> = live.iter().map(|h| h.url.as_str()).collect();
    ctx.write_lines(&ctx.live_hosts_path(), &urls)?;
    write_jsonl(&ctx.live_hosts_jsonl_path(), &live)?;
    tracing::info!(live = live.len(), "live hosts recorded");
    Ok(live)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_elides_default_ports() {
        assert_eq!(base_url("http", "Cam.Example.org", 80), "http://cam.example.org");
        assert_eq!(base_url("https", "cam.example.org", 443), "https://cam.example.org");
        assert_eq!(base_url("http", "cam.example.org", 8080), "http://cam.example.org:8080");
        assert_eq!(base_url("https", "cam.example.org", 8443), "https://cam.example.org:8443");
    }

    #[test]
    fn fallback_scheme_by_port() {
        assert_eq!(scheme_for_port(443), "https");
        assert_eq!(scheme_for_port(8443), "http");
        assert_eq!(scheme_for_port(80), "http");
    }

    #[test]
    fn parses_status_and_title() {
        let h = parse_fingerprint_line("https://cam.example.org:8443 [200] [Network Camera Login]").unwrap();
        assert_eq!(h.url, "https://cam.example.org:8443");
        assert_eq!(h.port, 8443);
        assert_eq!(h.status, Some(200));
        assert_eq!(h.title.as_deref(), Some("Network Camera Login"));

        let bare = parse_fingerprint_line("http://cam.example.org/").unwrap();
        assert_eq!(bare.url, "http://cam.example.org");
        assert_eq!(bare.status, None);

        assert!(parse_fingerprint_line("not-a-url [200]").is_none());
        assert!(parse_fingerprint_line("").is_none());
    }

    #[test]
    fn fingerprints_outside_candidates_are_dropped() {
        let lines = vec![
            "http://cam.example.org [200] [Cam]".to_string(),
            "http://cam.example.org:80 [200] [Duplicate]".to_string(),
            "http://evil.example.net [200] [Nope]".to_string(),
            "https://cam.example.org [301] []".to_string(),
        ];
        let candidates = vec!["cam.example.org".to_string()];
        let live = hosts_from_fingerprints(&lines, &candidates);
        let urls: Vec<&str> = live.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["http://cam.example.org", "https://cam.example.org"]);
        assert_eq!(live[0].title.as_deref(), Some("Cam"));
        assert_eq!(live[1].title, None);
        for h in &live {
            assert!(candidates.contains(&h.host));
        }
    }
}
