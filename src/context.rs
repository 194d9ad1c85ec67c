//! Per-run state: the target, the run directory and the artifact layout.
//!
//! Stages receive a `&RunContext` and return their results as values; nothing
//! in here changes after the directory tree has been created.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::ReconError;

pub const CONSENT_STATEMENT: &str =
    "Operator confirmed authorization to assess this domain. Read-only HTTP requests and bounded fetches only.";

#[derive(Debug, Clone)]
pub struct RunContext {
    pub domain: String,
    pub run_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    /// Create `<out_root>/<domain>_<timestamp>/` with its page and snapshot stores.
    pub fn create(out_root: &Path, domain: &str) -> Result<Self, ReconError> {
        let started_at = Utc::now();
        let dir_name = format!("{}_{}", safe_name(domain), started_at.format("%Y%m%d-%H%M%S"));
        Self::create_in(out_root.join(dir_name), domain, started_at)
    }

    /// Use `run_dir` as-is (created if missing).
    pub fn create_in(run_dir: PathBuf, domain: &str, started_at: DateTime<Utc>) -> Result<Self, ReconError> {
        let ctx = Self { domain: domain.to_string(), run_dir, started_at };
        for dir in [ctx.run_dir.clone(), ctx.raw_pages_dir(), ctx.snapshots_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| ReconError::fatal(&dir, e))?;
        }
        Ok(ctx)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.run_dir.join(name)
    }

    pub fn raw_pages_dir(&self) -> PathBuf { self.run_dir.join("raw_pages") }
    pub fn snapshots_dir(&self) -> PathBuf { self.run_dir.join("snapshots") }
    pub fn meta_path(&self) -> PathBuf { self.path("meta.txt") }
    pub fn passive_path(&self) -> PathBuf { self.path("subdomains_passive.txt") }
    pub fn brute_path(&self) -> PathBuf { self.path("subdomains_brute.txt") }
    pub fn subdomains_path(&self) -> PathBuf { self.path("subdomains.txt") }
    pub fn live_hosts_path(&self) -> PathBuf { self.path("live_hosts.txt") }
    pub fn live_hosts_jsonl_path(&self) -> PathBuf { self.path("live_hosts.jsonl") }
    pub fn pages_jsonl_path(&self) -> PathBuf { self.path("pages.jsonl") }
    pub fn media_hits_path(&self) -> PathBuf { self.path("media_hits.txt") }
    pub fn endpoints_path(&self) -> PathBuf { self.path("endpoints.txt") }
    pub fn endpoints_jsonl_path(&self) -> PathBuf { self.path("endpoints.jsonl") }
    pub fn endpoints_csv_path(&self) -> PathBuf { self.path("endpoints_sorted.csv") }
    pub fn endpoint_types_path(&self) -> PathBuf { self.path("endpoint_types.txt") }
    pub fn streams_path(&self) -> PathBuf { self.path("streams.txt") }
    pub fn stream_probes_path(&self) -> PathBuf { self.path("stream_probes.txt") }
    pub fn summary_path(&self) -> PathBuf { self.path("summary.txt") }

    /// Write the metadata note (target, timestamp, consent, tool availability).
    pub fn write_meta(&self, tools: &[(String, bool)]) -> Result<(), ReconError> {
        let mut note = String::new();
        note.push_str(&format!("target: {}\n", self.domain));
        note.push_str(&format!("started: {}\n", self.started_at.to_rfc3339()));
        note.push_str(&format!("consent: {}\n", CONSENT_STATEMENT));
        for (tool, present) in tools {
            let state = if *present { "available" } else { "missing" };
            note.push_str(&format!("tool {}: {}\n", tool, state));
        }
        let path = self.meta_path();
        std::fs::write(&path, note).map_err(|e| ReconError::fatal(path, e))
    }

    /// Write a stage artifact of one entry per line.
    pub fn write_lines<S: AsRef<str>>(&self, path: &Path, lines: &[S]) -> Result<(), ReconError> {
        let mut body = String::new();
        for line in lines {
            body.push_str(line.as_ref());
            body.push('\n');
        }
        std::fs::write(path, body).map_err(|e| ReconError::fatal(path, e))
    }
}

/// Directory-safe name for the target: every byte outside `[A-Za-z0-9]` becomes `_`.
pub fn safe_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// File stem for a URL-addressed artifact. Percent-encoding keeps distinct
/// URLs distinct, so `dev-cam` and `dev.cam` never share a file.
pub fn url_file_stem(url: &str) -> String {
    urlencoding::encode(url).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_flattens_urls() {
        assert_eq!(safe_name("http://cam.example.org:8080"), "http___cam_example_org_8080");
        assert_eq!(safe_name("https://a.b/onvif/device_service"), "https___a_b_onvif_device_service");
    }

    #[test]
    fn url_stems_are_distinct_and_reversible() {
        let a = url_file_stem("http://dev-cam.example.org");
        let b = url_file_stem("http://dev.cam.example.org");
        assert_ne!(a, b);
        assert!(!a.contains('/') && !a.contains(':'));
        assert_eq!(urlencoding::decode(&b).unwrap(), "http://dev.cam.example.org");
        assert_eq!(url_file_stem("http://cam.example.org:8080/snapshot.jpg"), "http%3A%2F%2Fcam.example.org%3A8080%2Fsnapshot.jpg");
    }

    #[test]
    fn create_builds_stores_and_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext::create(tmp.path(), "example.org").unwrap();
        assert!(ctx.raw_pages_dir().is_dir());
        assert!(ctx.snapshots_dir().is_dir());
        assert!(ctx.run_dir.file_name().unwrap().to_string_lossy().starts_with("example_org_"));

        ctx.write_meta(&[("subfinder".to_string(), false)]).unwrap();
        let meta = std::fs::read_to_string(ctx.meta_path()).unwrap();
        assert!(meta.contains("target: example.org"));
        assert!(meta.contains("consent: "));
        assert!(meta.contains("tool subfinder: missing"));
    }

    #[test]
    fn unwritable_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = RunContext::create(&blocker, "example.org").unwrap_err();
        assert!(err.is_fatal());
    }
}
