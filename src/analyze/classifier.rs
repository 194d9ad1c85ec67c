//! Fetches each live host's index page, stores it, and flags media signatures.

use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::analyze::signatures::SignatureSet;
use crate::context::{url_file_stem, RunContext};
use crate::error::ReconError;
use crate::output::write_jsonl;
use crate::probe::http_probe::fetch_page;
use crate::probe::live::LiveHost;
use crate::probe::throttle::Throttle;

#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub url: String,
    pub file: PathBuf,
    pub status: u16,
    pub bytes: usize,
    pub truncated: bool,
    pub title: Option<String>,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaHit {
    pub url: String,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub pages: Vec<PageSnapshot>,
    pub hits: Vec<MediaHit>,
    /// Hosts whose page could not be fetched
    pub failed: usize,
}

pub struct ClassifierSettings {
    pub timeout: Duration,
    pub page_cap: usize,
    pub workers: usize,
}

/// Text of the first `<title>` element, whitespace collapsed.
pub fn page_title(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let doc = Html::parse_document(&text);
    let sel = Selector::parse("title").ok()?;
    let title = doc.select(&sel).next()?.text().collect::<Vec<_>>().join(" ");
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() { None } else { Some(title) }
}

pub fn page_file(ctx: &RunContext, url: &str) -> PathBuf {
    ctx.raw_pages_dir().join(format!("{}.html", url_file_stem(url)))
}

async fn classify_one(
    ctx: &RunContext,
    host: &LiveHost,
    signatures: &SignatureSet,
    client: &Client,
    throttle: &Throttle,
    settings: &ClassifierSettings,
) -> Result<Option<PageSnapshot>, ReconError> {
    let fetched = {
        let _permit = throttle.acquire(&host.host).await?;
        fetch_page(client, &host.url, settings.timeout, settings.page_cap).await
    };
    let fetched = match fetched {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!("page fetch skipped: {}", e);
            return Ok(None);
        }
    };

    let file = page_file(ctx, &host.url);
    tokio::fs::write(&file, &fetched.body).await.map_err(|e| ReconError::fatal(&file, e))?;

    let matched = signatures.matches(&fetched.body);
    if !matched.is_empty() {
        println!("[+] media indicators on {} ({})", host.url, matched.join(", "));
    }
    Ok(Some(PageSnapshot {
        url: host.url.clone(),
        file,
        status: fetched.status,
        bytes: fetched.body.len(),
        truncated: fetched.truncated,
        title: page_title(&fetched.body),
        signatures: matched,
    }))
}

/// Fetch, store, and match every live host's page.
pub async fn classify_hosts(
    ctx: &RunContext,
    hosts: &[LiveHost],
    signatures: &SignatureSet,
    client: &Client,
    throttle: &Throttle,
    settings: &ClassifierSettings,
) -> Result<Classification, ReconError> {
    let results: Vec<Result<Option<PageSnapshot>, ReconError>> = stream::iter(hosts.iter())
        .map(|h| classify_one(ctx, h, signatures, client, throttle, settings))
        .buffer_unordered(settings.workers.max(1))
        .collect()
        .await;

    let mut out = Classification::default();
    for r in results {
        match r? {
            Some(page) => out.pages.push(page),
            None => out.failed += 1,
        }
    }
    out.pages.sort_by(|a, b| a.url.cmp(&b.url));
    out.hits = out
        .pages
        .iter()
        .filter(|p| !p.signatures.is_empty())
        .map(|p| MediaHit { url: p.url.clone(), signatures: p.signatures.clone() })
        .collect();

    let hit_lines: Vec<String> = out
        .hits
        .iter()
        .map(|h| format!("{} {}", h.url, h.signatures.join(",")))
        .collect();
    ctx.write_lines(&ctx.media_hits_path(), &hit_lines)?;
    write_jsonl(&ctx.pages_jsonl_path(), &out.pages)?;

    tracing::info!(pages = out.pages.len(), hits = out.hits.len(), failed = out.failed, "content classified");
    Ok(out)
}
