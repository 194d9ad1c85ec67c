use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ReconError;

/// Counts gathered from every stage of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub domain: String,
    pub started_at: String,
    pub duration_secs: u64,
    pub passive_subdomains: usize,
    pub brute_subdomains: usize,
    pub subdomains: usize,
    pub live_hosts: usize,
    pub pages_fetched: usize,
    pub media_hits: usize,
    pub endpoints_probed: usize,
    pub endpoints_ok: usize,
    pub samples: usize,
    pub streams_discovered: usize,
    /// `None` when stream verification did not run
    pub streams_ok: Option<usize>,
    pub endpoint_log: PathBuf,
    pub raw_pages_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub skipped: Vec<String>,
}

impl RunSummary {
    /// The fixed-format report.
    pub fn render(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Camera Recon Summary ===\n");
        report.push_str(&format!("Domain scanned:           {}\n", self.domain));
        report.push_str(&format!("Started:                  {}\n", self.started_at));
        report.push_str(&format!("Duration:                 {}s\n", self.duration_secs));
        report.push_str(&format!(
            "Unique subdomains:        {} (passive {}, brute-force {})\n",
            self.subdomains, self.passive_subdomains, self.brute_subdomains
        ));
        report.push_str(&format!("Live hosts:               {}\n", self.live_hosts));
        report.push_str(&format!("Pages fetched:            {}\n", self.pages_fetched));
        report.push_str(&format!("Hosts with media hints:   {}\n", self.media_hits));
        report.push_str(&format!(
            "Endpoint probes:          {} ({} answered 2xx, {} samples saved)\n",
            self.endpoints_probed, self.endpoints_ok, self.samples
        ));
        report.push_str(&format!("Endpoint results log:     {}\n", self.endpoint_log.display()));
        report.push_str(&format!("Discovered streams:       {}\n", self.streams_discovered));
        match self.streams_ok {
            Some(ok) => report.push_str(&format!("Streams verified OK:      {}/{}\n", ok, self.streams_discovered)),
            None => report.push_str("Streams verified OK:      skipped\n"),
        }
        report.push_str(&format!("Raw page store:           {}\n", self.raw_pages_dir.display()));
        report.push_str(&format!("Snapshot store:           {}\n", self.snapshots_dir.display()));
        if self.skipped.is_empty() {
            report.push_str("Skipped:                  none\n");
        } else {
            report.push_str(&format!("Skipped:                  {}\n", self.skipped.join("; ")));
        }
        report
    }

    pub fn write(&self, path: &Path) -> Result<(), ReconError> {
        std::fs::write(path, self.render()).map_err(|e| ReconError::fatal(path, e))
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        print!("{}", self.render());
        println!("{}\n", "=".repeat(60));
    }
}
