use std::path::Path;

use csv::Writer;

use crate::analyze::endpoints::EndpointResult;
use crate::error::ReconError;

/// Endpoint results as a table sorted by host, then path.
pub fn write_endpoints_csv(path: &Path, items: &[EndpointResult]) -> Result<(), ReconError> {
    write_rows(path, items).map_err(|e| ReconError::fatal(path, std::io::Error::from(e)))
}

fn write_rows(path: &Path, items: &[EndpointResult]) -> csv::Result<()> {
    let mut sorted: Vec<&EndpointResult> = items.iter().collect();
    sorted.sort_by(|a, b| a.host.cmp(&b.host).then_with(|| a.path.cmp(&b.path)));

    let mut w = Writer::from_path(path)?;
    w.write_record(["host", "path", "status", "url", "sample", "sample_bytes", "detected_type"])?;
    for it in sorted {
        w.write_record(&[
            it.host.clone(),
            it.path.clone(),
            it.status.to_string(),
            it.url.clone(),
            it.sample.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
            it.sample_bytes.map(|v| v.to_string()).unwrap_or_default(),
            it.detected_type.clone().unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
