use std::path::PathBuf;
use thiserror::Error;

/// Failure classes seen during a run.
///
/// Only `FatalEnvironment` ends a run. Everything else is caught at the item or
/// stage boundary, logged, and turned into an empty or failure-flagged result.
#[derive(Error, Debug)]
pub enum ReconError {
    /// The external tool backing a capability is not installed.
    #[error("tool not available: {tool}")]
    ToolAbsent { tool: String },

    /// The tool ran but did not produce usable output.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// A single request against a single target failed.
    #[error("network error for {url}: {kind}")]
    Network { url: String, kind: NetworkKind },

    /// Input data (wordlist, catalog file, config) could not be used.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A shared gate was shut while work was still queued on it.
    #[error("interrupted: {0}")]
    Interrupted(&'static str),

    /// The run directory or one of its artifacts cannot be created.
    #[error("cannot write {}: {source}", path.display())]
    FatalEnvironment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconError {
    pub fn tool_absent(tool: &str) -> Self {
        ReconError::ToolAbsent { tool: tool.to_string() }
    }

    pub fn fatal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReconError::FatalEnvironment { path: path.into(), source }
    }

    pub fn network(url: &str, error: &reqwest::Error) -> Self {
        ReconError::Network { url: url.to_string(), kind: NetworkKind::from_reqwest(error) }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconError::FatalEnvironment { .. })
    }
}

/// Coarse category of a failed HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Timeout,
    Connect,
    Redirect,
    Body,
    Request,
    Other,
}

impl NetworkKind {
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            NetworkKind::Timeout
        } else if error.is_connect() {
            NetworkKind::Connect
        } else if error.is_redirect() {
            NetworkKind::Redirect
        } else if error.is_body() || error.is_decode() {
            NetworkKind::Body
        } else if error.is_request() {
            NetworkKind::Request
        } else {
            NetworkKind::Other
        }
    }
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NetworkKind::Timeout => "timeout",
            NetworkKind::Connect => "connection failed",
            NetworkKind::Redirect => "redirect error",
            NetworkKind::Body => "body error",
            NetworkKind::Request => "request error",
            NetworkKind::Other => "other",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_environment_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(ReconError::fatal("/nope", io).is_fatal());
        assert!(!ReconError::tool_absent("subfinder").is_fatal());
        assert!(!ReconError::MalformedInput("empty wordlist".into()).is_fatal());
    }

    #[test]
    fn messages_name_the_subject() {
        let e = ReconError::Network { url: "http://cam.example.org".into(), kind: NetworkKind::Timeout };
        assert_eq!(e.to_string(), "network error for http://cam.example.org: timeout");
        assert_eq!(ReconError::tool_absent("ffprobe").to_string(), "tool not available: ffprobe");
    }
}
