//! Read-only probes of the camera endpoint catalog against every live host.
//!
//! Each (host, path) pair gets one HEAD. A 2xx answer earns one ranged GET whose
//! body is capped, stored under `snapshots/`, and optionally labelled by the
//! content-type detector. Nothing but HEAD and GET is ever sent.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::context::{url_file_stem, RunContext};
use crate::error::ReconError;
use crate::external::ContentTypeDetector;
use crate::output::async_writer::{finish, spawn_jsonl_writer, spawn_line_writer};
use crate::output::write_endpoints_csv;
use crate::probe::http_probe::{fetch_sample, head_status, join_path};
use crate::probe::live::LiveHost;
use crate::probe::throttle::Throttle;

/// HTTP status of a probe; `000` when no valid status was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeStatus(u16);

impl ProbeStatus {
    pub const FAILED: ProbeStatus = ProbeStatus(0);

    /// Codes outside 100..=599 collapse to the failure sentinel.
    pub fn from_code(code: u16) -> Self {
        if (100..=599).contains(&code) { ProbeStatus(code) } else { ProbeStatus::FAILED }
    }

    pub fn code(self) -> u16 { self.0 }
    pub fn is_failed(self) -> bool { self.0 == 0 }
    pub fn is_success(self) -> bool { (200..300).contains(&self.0) }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointResult {
    /// Base URL of the live host
    pub host: String,
    pub path: String,
    pub url: String,
    pub status: ProbeStatus,
    pub sample: Option<PathBuf>,
    pub sample_bytes: Option<usize>,
    pub detected_type: Option<String>,
}

impl EndpointResult {
    /// `<status> <url>`, the endpoint log format.
    pub fn log_line(&self) -> String {
        format!("{} {}", self.status, self.url)
    }
}

pub struct EndpointSettings {
    pub catalog: Vec<String>,
    pub timeout: Duration,
    pub sample_cap: usize,
    pub workers: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointReport {
    pub results: Vec<EndpointResult>,
    pub successes: usize,
    pub samples: usize,
}

pub fn sample_file(ctx: &RunContext, url: &str) -> PathBuf {
    ctx.snapshots_dir().join(format!("{}.bin", url_file_stem(url)))
}

struct Sinks {
    lines: mpsc::Sender<String>,
    records: mpsc::Sender<EndpointResult>,
    types: mpsc::Sender<String>,
}

#[allow(clippy::too_many_arguments)]
async fn test_one(
    ctx: &RunContext,
    host: &LiveHost,
    path: &str,
    client: &Client,
    throttle: &Throttle,
    detector: &dyn ContentTypeDetector,
    settings: &EndpointSettings,
    sinks: &Sinks,
) -> Result<EndpointResult, ReconError> {
    let url = join_path(&host.url, path);

    let status = {
        let _permit = throttle.acquire(&host.host).await?;
        match head_status(client, &url, settings.timeout).await {
            Ok(code) => ProbeStatus::from_code(code),
            Err(e) => {
                tracing::debug!("{}", e);
                ProbeStatus::FAILED
            }
        }
    };

    let mut result = EndpointResult {
        host: host.url.clone(),
        path: path.to_string(),
        url: url.clone(),
        status,
        sample: None,
        sample_bytes: None,
        detected_type: None,
    };
    let _ = sinks.lines.send(result.log_line()).await;

    if status.is_success() {
        let sampled = {
            let _permit = throttle.acquire(&host.host).await?;
            fetch_sample(client, &url, settings.timeout, settings.sample_cap).await
        };
        match sampled {
            Ok(fetched) => {
                let file = sample_file(ctx, &url);
                tokio::fs::write(&file, &fetched.body).await.map_err(|e| ReconError::fatal(&file, e))?;
                result.sample_bytes = Some(fetched.body.len());
                if detector.available() {
                    match detector.detect(&file).await {
                        Ok(label) => {
                            let _ = sinks.types.send(format!("{} {}", url, label)).await;
                            result.detected_type = Some(label);
                        }
                        Err(e) => tracing::debug!("type detection failed for {}: {}", url, e),
                    }
                }
                result.sample = Some(file);
                println!("[+] {} {} ({} bytes{})", status, url, fetched.body.len(),
                    result.detected_type.as_deref().map(|t| format!(", {}", t)).unwrap_or_default());
            }
            Err(e) => tracing::debug!("sample fetch failed: {}", e),
        }
    }

    let _ = sinks.records.send(result.clone()).await;
    Ok(result)
}

/// Probe every catalog path on every live host.
pub async fn test_endpoints(
    ctx: &RunContext,
    hosts: &[LiveHost],
    client: &Client,
    throttle: &Throttle,
    detector: &dyn ContentTypeDetector,
    settings: &EndpointSettings,
) -> Result<EndpointReport, ReconError> {
    let (lines_tx, lines_rx) = mpsc::channel(256);
    let (records_tx, records_rx) = mpsc::channel(256);
    let (types_tx, types_rx) = mpsc::channel(256);
    let lines_writer = spawn_line_writer(ctx.endpoints_path(), lines_rx);
    let records_writer = spawn_jsonl_writer(ctx.endpoints_jsonl_path(), records_rx);
    let types_writer = spawn_line_writer(ctx.endpoint_types_path(), types_rx);
    let sinks = Sinks { lines: lines_tx, records: records_tx, types: types_tx };

    let pairs: Vec<(&LiveHost, &str)> = hosts
        .iter()
        .flat_map(|h| settings.catalog.iter().map(move |p| (h, p.as_str())))
        .collect();

    let bar = if settings.show_progress { ProgressBar::new(pairs.len() as u64) } else { ProgressBar::hidden() };
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} endpoints")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let sinks_ref = &sinks;
    let bar_ref = &bar;
    let outcomes: Vec<Result<EndpointResult, ReconError>> = stream::iter(pairs)
        .map(|(h, p)| async move {
            let r = test_one(ctx, h, p, client, throttle, detector, settings, sinks_ref).await;
            bar_ref.inc(1);
            r
        })
        .buffer_unordered(settings.workers.max(1))
        .collect()
        .await;
    bar.finish_and_clear();

    drop(sinks);
    finish(lines_writer, ctx.endpoints_path()).await?;
    finish(records_writer, ctx.endpoints_jsonl_path()).await?;
    finish(types_writer, ctx.endpoint_types_path()).await?;

    let mut report = EndpointReport::default();
    for o in outcomes {
        let r = o?;
        if r.status.is_success() { report.successes += 1; }
        if r.sample.is_some() { report.samples += 1; }
        report.results.push(r);
    }
    report.results.sort_by(|a, b| a.host.cmp(&b.host).then_with(|| a.path.cmp(&b.path)));
    write_endpoints_csv(&ctx.endpoints_csv_path(), &report.results)?;

    tracing::info!(probed = report.results.len(), ok = report.successes, samples = report.samples, "endpoints tested");
    Ok(report)
}
