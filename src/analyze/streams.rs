use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;

use crate::context::RunContext;
use crate::error::ReconError;
use crate::external::StreamProber;

/// HLS playlists and RTSP URLs as they appear in page source.
static STREAM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s"'<>]+\.m3u8|rtsp://[^\s"'<>]+"#).expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamOutcome {
    pub url: String,
    pub ok: bool,
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.ok { "OK" } else { "FAIL" };
        write!(f, "{} {}", verdict, self.url)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamReport {
    pub discovered: Vec<String>,
    /// `None` when verification did not run
    pub outcomes: Option<Vec<StreamOutcome>>,
}

impl StreamReport {
    pub fn ok_count(&self) -> usize {
        self.outcomes.as_ref().map(|o| o.iter().filter(|s| s.ok).count()).unwrap_or(0)
    }
}

/// Sorted, deduplicated stream URLs found in any of `bodies`.
pub fn extract_stream_urls<I, B>(bodies: I) -> Vec<String>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut found = BTreeSet::new();
    for body in bodies {
        for m in STREAM_URL.find_iter(body.as_ref()) {
            found.insert(String::from_utf8_lossy(m.as_bytes()).into_owned());
        }
    }
    found.into_iter().collect()
}

/// Every stored page body, in file name order. A missing store reads as empty.
pub fn read_page_store(dir: &Path) -> Vec<Vec<u8>> {
    let mut files: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).filter(|p| p.is_file()).collect(),
        Err(e) => {
            tracing::warn!("page store {} unreadable: {}", dir.display(), e);
            return Vec::new();
        }
    };
    files.sort();
    files
        .into_iter()
        .filter_map(|p| match std::fs::read(&p) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::debug!("skipping {}: {}", p.display(), e);
                None
            }
        })
        .collect()
}

/// One metadata probe per URL, `delay` apart, each bounded by `timeout`.
pub async fn probe_streams(urls: &[String], prober: &dyn StreamProber, delay: Duration, timeout: Duration) -> Vec<StreamOutcome> {
    let mut outcomes = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        let ok = match tokio::time::timeout(timeout, prober.probe(url, timeout)).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                tracing::debug!("stream probe failed for {}: {}", url, e);
                false
            }
            Err(_) => {
                tracing::debug!("stream probe timed out for {}", url);
                false
            }
        };
        let outcome = StreamOutcome { url: url.clone(), ok };
        println!("[{}] {}", if ok { "+" } else { "-" }, outcome);
        outcomes.push(outcome);
    }
    outcomes
}

/// Extract stream candidates from the page store and verify them if a prober is installed.
pub async fn verify_streams(
    ctx: &RunContext,
    prober: &dyn StreamProber,
    enabled: bool,
    delay: Duration,
    timeout: Duration,
) -> Result<StreamReport, ReconError> {
    let discovered = extract_stream_urls(read_page_store(&ctx.raw_pages_dir()));
    ctx.write_lines(&ctx.streams_path(), &discovered)?;

    if !enabled {
        tracing::info!("stream verification disabled");
        return Ok(StreamReport { discovered, outcomes: None });
    }
    if !prober.available() {
        tracing::warn!("stream verification skipped: {}", ReconError::tool_absent(prober.name()));
        println!("[!] {} not installed, skipping stream verification", prober.name());
        return Ok(StreamReport { discovered, outcomes: None });
    }

    let outcomes = probe_streams(&discovered, prober, delay, timeout).await;
    let lines: Vec<String> = outcomes.iter().map(|o| o.to_string()).collect();
    ctx.write_lines(&ctx.stream_probes_path(), &lines)?;
    Ok(StreamReport { discovered, outcomes: Some(outcomes) })
}
