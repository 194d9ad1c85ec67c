use regex::bytes::{RegexSet, RegexSetBuilder};

use crate::error::ReconError;

/// Case-insensitive substring signatures for camera / media pages.
pub struct SignatureSet {
    patterns: Vec<String>,
    set: RegexSet,
}

impl SignatureSet {
    pub fn new(patterns: &[String]) -> Result<Self, ReconError> {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let escaped: Vec<String> = patterns.iter().map(|p| regex::escape(p)).collect();
        let set = RegexSetBuilder::new(&escaped)
            .case_insensitive(true)
            .build()
            .map_err(|e| ReconError::MalformedInput(format!("signature list: {}", e)))?;
        Ok(Self { patterns, set })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, body: &[u8]) -> bool {
        self.set.is_match(body)
    }

    /// Every signature present in `body`, in list order.
    pub fn matches(&self, body: &[u8]) -> Vec<String> {
        self.set
            .matches(body)
            .into_iter()
            .map(|i| self.patterns[i].clone())
            .collect()
    }
}
