//! Capability interfaces for the external tools the pipeline delegates to,
//! plus the command-line adapters that back them.
//!
//! Every capability reports whether it is available. A stage that finds its
//! capability missing degrades (empty result, fallback, or skip) instead of failing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use which::which;

use crate::config::ScanConfig;
use crate::error::ReconError;
use crate::external::runner::run_lines;

pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn available(&self) -> bool;
}

/// Passive subdomain source. Output: candidate names, one per entry.
#[async_trait]
pub trait PassiveEnumerator: Capability {
    async fn enumerate(&self, domain: &str) -> Result<Vec<String>, ReconError>;
}

/// Resolves FQDN candidates. Output: raw result lines, resolved name first.
#[async_trait]
pub trait BruteResolver: Capability {
    async fn resolve(&self, fqdns: &[String]) -> Result<Vec<String>, ReconError>;
}

/// Checks hosts across ports. Output: raw result lines, URL first.
#[async_trait]
pub trait HttpFingerprinter: Capability {
    async fn fingerprint(&self, hosts: &[String], ports: &[u16]) -> Result<Vec<String>, ReconError>;
}

/// Asks for stream format metadata only. `Ok(true)` means metadata came back.
#[async_trait]
pub trait StreamProber: Capability {
    async fn probe(&self, url: &str, limit: Duration) -> Result<bool, ReconError>;
}

/// Labels a saved sample file.
#[async_trait]
pub trait ContentTypeDetector: Capability {
    async fn detect(&self, sample: &Path) -> Result<String, ReconError>;
}

fn on_path(bin: &str) -> bool {
    which(bin).is_ok()
}

pub struct Subfinder {
    pub bin: String,
    pub limit: Duration,
}

impl Capability for Subfinder {
    fn name(&self) -> &str { &self.bin }
    fn available(&self) -> bool { on_path(&self.bin) }
}

#[async_trait]
impl PassiveEnumerator for Subfinder {
    async fn enumerate(&self, domain: &str) -> Result<Vec<String>, ReconError> {
        if !self.available() { return Err(ReconError::tool_absent(&self.bin)); }
        let out = run_lines(&self.bin, &["-d", domain, "-silent"], None, self.limit).await?;
        Ok(out.lines)
    }
}

pub struct Dnsx {
    pub bin: String,
    pub limit: Duration,
}

impl Capability for Dnsx {
    fn name(&self) -> &str { &self.bin }
    fn available(&self) -> bool { on_path(&self.bin) }
}

#[async_trait]
impl BruteResolver for Dnsx {
    async fn resolve(&self, fqdns: &[String]) -> Result<Vec<String>, ReconError> {
        if !self.available() { return Err(ReconError::tool_absent(&self.bin)); }
        if fqdns.is_empty() { return Ok(Vec::new()); }
        let input = fqdns.join("\n") + "\n";
        let out = run_lines(&self.bin, &["-silent"], Some(input), self.limit).await?;
        Ok(out.lines)
    }
}

pub struct Httpx {
    pub bin: String,
    pub limit: Duration,
}

impl Capability for Httpx {
    fn name(&self) -> &str { &self.bin }
    fn available(&self) -> bool { on_path(&self.bin) }
}

#[async_trait]
impl HttpFingerprinter for Httpx {
    async fn fingerprint(&self, hosts: &[String], ports: &[u16]) -> Result<Vec<String>, ReconError> {
        if !self.available() { return Err(ReconError::tool_absent(&self.bin)); }
        if hosts.is_empty() { return Ok(Vec::new()); }
        let port_list = ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
        let input = hosts.join("\n") + "\n";
        let args = ["-silent", "-no-color", "-status-code", "-title", "-ports", port_list.as_str()];
        let out = run_lines(&self.bin, &args, Some(input), self.limit).await?;
        if !out.success && out.lines.is_empty() {
            return Err(ReconError::Tool { tool: self.bin.clone(), message: "exited with failure".into() });
        }
        Ok(out.lines)
    }
}

pub struct Ffprobe {
    pub bin: String,
}

impl Capability for Ffprobe {
    fn name(&self) -> &str { &self.bin }
    fn available(&self) -> bool { on_path(&self.bin) }
}

#[async_trait]
impl StreamProber for Ffprobe {
    async fn probe(&self, url: &str, limit: Duration) -> Result<bool, ReconError> {
        if !self.available() { return Err(ReconError::tool_absent(&self.bin)); }
        let mut args = vec!["-v", "error"];
        if url.starts_with("rtsp://") {
            args.extend(["-rtsp_transport", "tcp"]);
        }
        args.extend([
            "-show_entries", "format=format_name,duration",
            "-of", "default=noprint_wrappers=1",
            url,
        ]);
        let out = run_lines(&self.bin, &args, None, limit).await?;
        Ok(out.success && out.lines.iter().any(|l| l.starts_with("format_name=")))
    }
}

pub struct FileCommand {
    pub bin: String,
}

impl Capability for FileCommand {
    fn name(&self) -> &str { &self.bin }
    fn available(&self) -> bool { on_path(&self.bin) }
}

#[async_trait]
impl ContentTypeDetector for FileCommand {
    async fn detect(&self, sample: &Path) -> Result<String, ReconError> {
        if !self.available() { return Err(ReconError::tool_absent(&self.bin)); }
        let path = sample.to_string_lossy();
        let out = run_lines(&self.bin, &["-b", path.as_ref()], None, Duration::from_secs(10)).await?;
        out.lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .find(|l| !l.is_empty())
            .ok_or_else(|| ReconError::Tool { tool: self.bin.clone(), message: "no output".into() })
    }
}

/// Stand-in for a capability that is not installed.
pub struct Absent(pub &'static str);

impl Capability for Absent {
    fn name(&self) -> &str { self.0 }
    fn available(&self) -> bool { false }
}

#[async_trait]
impl PassiveEnumerator for Absent {
    async fn enumerate(&self, _domain: &str) -> Result<Vec<String>, ReconError> {
        Err(ReconError::tool_absent(self.0))
    }
}

#[async_trait]
impl BruteResolver for Absent {
    async fn resolve(&self, _fqdns: &[String]) -> Result<Vec<String>, ReconError> {
        Err(ReconError::tool_absent(self.0))
    }
}

#[async_trait]
impl HttpFingerprinter for Absent {
    async fn fingerprint(&self, _hosts: &[String], _ports: &[u16]) -> Result<Vec<String>, ReconError> {
        Err(ReconError::tool_absent(self.0))
    }
}

#[async_trait]
impl StreamProber for Absent {
    async fn probe(&self, _url: &str, _limit: Duration) -> Result<bool, ReconError> {
        Err(ReconError::tool_absent(self.0))
    }
}

#[async_trait]
impl ContentTypeDetector for Absent {
    async fn detect(&self, _sample: &Path) -> Result<String, ReconError> {
        Err(ReconError::tool_absent(self.0))
    }
}

/// The set of capabilities a run uses.
#[derive(Clone)]
pub struct Toolbox {
    pub passive: Arc<dyn PassiveEnumerator>,
    pub brute: Arc<dyn BruteResolver>,
    pub fingerprinter: Arc<dyn HttpFingerprinter>,
    pub stream_prober: Arc<dyn StreamProber>,
    pub type_detector: Arc<dyn ContentTypeDetector>,
}

impl Toolbox {
    /// Command-line tools found on PATH.
    pub fn detect(config: &ScanConfig) -> Self {
        let limit = config.tool_timeout();
        Self {
            passive: Arc::new(Subfinder { bin: "subfinder".into(), limit }),
            brute: Arc::new(Dnsx { bin: "dnsx".into(), limit }),
            fingerprinter: Arc::new(Httpx { bin: "httpx".into(), limit }),
            stream_prober: Arc::new(Ffprobe { bin: "ffprobe".into() }),
            type_detector: Arc::new(FileCommand { bin: "file".into() }),
        }
    }

    /// Nothing installed.
    pub fn absent() -> Self {
        Self {
            passive: Arc::new(Absent("subfinder")),
            brute: Arc::new(Absent("dnsx")),
            fingerprinter: Arc::new(Absent("httpx")),
            stream_prober: Arc::new(Absent("ffprobe")),
            type_detector: Arc::new(Absent("file")),
        }
    }

    pub fn availability(&self) -> Vec<(String, bool)> {
        vec![
            (self.passive.name().to_string(), self.passive.available()),
            (self.brute.name().to_string(), self.brute.available()),
            (self.fingerprinter.name().to_string(), self.fingerprinter.available()),
            (self.stream_prober.name().to_string(), self.stream_prober.available()),
            (self.type_detector.name().to_string(), self.type_detector.available()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_tools_report_tool_absent() {
        let tools = Toolbox::absent();
        assert!(tools.availability().iter().all(|(_, present)| !present));
        let err = tools.passive.enumerate("example.org").await.unwrap_err();
        assert!(matches!(err, ReconError::ToolAbsent { .. }));
        let err = tools.stream_prober.probe("rtsp://x/", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ReconError::ToolAbsent { .. }));
    }

    #[tokio::test]
    async fn uninstalled_binary_is_not_available() {
        let sub = Subfinder { bin: "subfinder-not-installed-4711".into(), limit: Duration::from_secs(1) };
        assert!(!sub.available());
        assert!(matches!(sub.enumerate("example.org").await, Err(ReconError::ToolAbsent { .. })));
    }
}
