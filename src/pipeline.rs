//! Runs the stages in order: discovery, live probing, page classification,
//! endpoint testing, stream verification, summary.
//!
//! Each stage takes the previous stage's output and the run context and
//! returns its own output. Only an unwritable run directory stops a run.

use std::path::PathBuf;
use std::time::Instant;

use crate::analyze::classifier::{classify_hosts, ClassifierSettings};
use crate::analyze::endpoints::{test_endpoints, EndpointSettings};
use crate::analyze::signatures::SignatureSet;
use crate::analyze::streams::verify_streams;
use crate::config::ScanConfig;
use crate::context::RunContext;
use crate::discover::subdomain::resolve_targets;
use crate::error::ReconError;
use crate::external::Toolbox;
use crate::http_client::HttpClients;
use crate::output::RunSummary;
use crate::probe::live::probe_live_hosts;
use crate::probe::throttle::Throttle;

pub struct Pipeline {
    ctx: RunContext,
    config: ScanConfig,
    tools: Toolbox,
    clients: HttpClients,
    wordlist: Option<PathBuf>,
    signatures: SignatureSet,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(
        ctx: RunContext,
        config: ScanConfig,
        tools: Toolbox,
        clients: HttpClients,
        wordlist: Option<PathBuf>,
    ) -> Result<Self, ReconError> {
        let signatures = SignatureSet::new(&config.signatures)?;
        Ok(Self { ctx, config, tools, clients, wordlist, signatures, show_progress: false })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Stages whose capability is missing, as human-readable notes.
    fn skipped_stages(&self) -> Vec<String> {
        let mut skipped = Vec::new();
        if !self.tools.passive.available() {
            skipped.push(format!("passive discovery ({} missing)", self.tools.passive.name()));
        }
        if self.wordlist.is_none() {
            skipped.push("brute-force discovery (no wordlist)".to_string());
        } else if !self.tools.brute.available() {
            skipped.push(format!("brute-force discovery ({} missing)", self.tools.brute.name()));
        }
        if !self.tools.fingerprinter.available() {
            skipped.push(format!("fingerprinting ({} missing, HEAD fallback used)", self.tools.fingerprinter.name()));
        }
        if !self.tools.type_detector.available() {
            skipped.push(format!("sample typing ({} missing)", self.tools.type_detector.name()));
        }
        if !self.config.verify_streams {
            skipped.push("stream verification (disabled)".to_string());
        } else if !self.tools.stream_prober.available() {
            skipped.push(format!("stream verification ({} missing)", self.tools.stream_prober.name()));
        }
        skipped
    }

    pub async fn run(&self) -> Result<RunSummary, ReconError> {
        let start = Instant::now();
        let ctx = &self.ctx;
        let config = &self.config;
        let workers = config.workers();

        ctx.write_meta(&self.tools.availability())?;

        println!("[*] Subdomain discovery for {}...", ctx.domain);
        let targets = resolve_targets(
            ctx,
            self.wordlist.as_deref(),
            config.brute_cap,
            self.tools.passive.as_ref(),
            self.tools.brute.as_ref(),
        )
        .await?;
        println!("   Found: {} unique subdomains", targets.candidates.len());

        println!("[*] Probing live hosts on ports {:?}...", config.ports);
        // the HEAD fallback stays sequential regardless of the worker count
        let live_throttle = Throttle::new(1, 1, config.delay());
        let live = probe_live_hosts(
            ctx,
            &targets.candidates,
            &config.ports,
            self.tools.fingerprinter.as_ref(),
            &self.clients.probe,
            &live_throttle,
            config.live_timeout(),
        )
        .await?;
        println!("   Live: {} hosts", live.len());

        let throttle = Throttle::new(workers, usize::from(config.per_host), config.delay());

        println!("[*] Classifying page content...");
        let classifier_settings = ClassifierSettings {
            timeout: config.timeout(),
            page_cap: config.page_cap,
            workers,
        };
        let classified = classify_hosts(ctx, &live, &self.signatures, &self.clients.fetch, &throttle, &classifier_settings).await?;
        println!("   Media indicators: {} of {} pages", classified.hits.len(), classified.pages.len());

        println!("[*] Testing {} catalog paths per live host...", config.catalog.len());
        let endpoint_settings = EndpointSettings {
            catalog: config.catalog.clone(),
            timeout: config.timeout(),
            sample_cap: config.sample_cap,
            workers,
            show_progress: self.show_progress,
        };
        let endpoints = test_endpoints(
            ctx,
            &live,
            &self.clients.probe,
            &throttle,
            self.tools.type_detector.as_ref(),
            &endpoint_settings,
        )
        .await?;
        println!("   Probed: {} ({} answered 2xx)", endpoints.results.len(), endpoints.successes);

        println!("[*] Extracting and verifying streams...");
        let streams = verify_streams(
            ctx,
            self.tools.stream_prober.as_ref(),
            config.verify_streams,
            config.stream_delay(),
            config.stream_timeout(),
        )
        .await?;

        let summary = RunSummary {
            domain: ctx.domain.clone(),
            started_at: ctx.started_at.to_rfc3339(),
            duration_secs: start.elapsed().as_secs(),
            passive_subdomains: targets.passive.len(),
            brute_subdomains: targets.brute.len(),
            subdomains: targets.candidates.len(),
            live_hosts: live.len(),
            pages_fetched: classified.pages.len(),
            media_hits: classified.hits.len(),
            endpoints_probed: endpoints.results.len(),
            endpoints_ok: endpoints.successes,
            samples: endpoints.samples,
            streams_discovered: streams.discovered.len(),
            streams_ok: streams.outcomes.as_ref().map(|_| streams.ok_count()),
            endpoint_log: ctx.endpoints_path(),
            raw_pages_dir: ctx.raw_pages_dir(),
            snapshots_dir: ctx.snapshots_dir(),
            skipped: self.skipped_stages(),
        };
        summary.write(&ctx.summary_path())?;
        Ok(summary)
    }
}
