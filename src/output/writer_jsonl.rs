use std::path::Path;

use serde::Serialize;

use crate::error::ReconError;

/// Write `items` as JSON lines, replacing any existing file.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), ReconError> {
    let mut out = String::new();
    for it in items {
        match serde_json::to_string(it) {
            Ok(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            Err(e) => tracing::error!(error=%e, "failed to serialize record"),
        }
    }
    std::fs::write(path, out).map_err(|e| ReconError::fatal(path, e))
}
