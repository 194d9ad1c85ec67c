use std::collections::BTreeSet;
use std::path::Path;

use crate::config::read_list_file;
use crate::context::RunContext;
use crate::error::ReconError;
use crate::external::{BruteResolver, PassiveEnumerator};

/// Candidates from both discovery sources, merged.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTargets {
    pub passive: Vec<String>,
    pub brute: Vec<String>,
    pub candidates: Vec<String>,
}

/// Normalize, drop blanks, sort and deduplicate. Running it on its own output is a no-op.
pub fn merge_candidates<I, S>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sources
        .into_iter()
        .map(|s| s.as_ref().trim().trim_end_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `<prefix>.<domain>` for up to `cap` wordlist prefixes.
pub fn brute_candidates(domain: &str, wordlist: &Path, cap: usize) -> Result<Vec<String>, ReconError> {
    let prefixes = read_list_file(wordlist, cap)?;
    Ok(prefixes
        .into_iter()
        .map(|p| format!("{}.{}", p.trim_end_matches('.'), domain))
        .collect())
}

/// First whitespace-delimited field of every non-blank line.
pub fn first_fields(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|l| l.split_whitespace().next())
        .map(|s| s.to_string())
        .collect()
}

/// Passive enumeration. A missing or failing tool yields no candidates.
pub async fn passive_discovery(domain: &str, passive: &dyn PassiveEnumerator) -> Vec<String> {
    match passive.enumerate(domain).await {
        Ok(lines) => merge_candidates(lines),
        Err(e) => {
            tracing::warn!("passive discovery skipped: {}", e);
            Vec::new()
        }
    }
}

/// Wordlist brute force through the resolver. No wordlist, an unreadable one,
/// or a missing resolver yields no candidates.
pub async fn brute_discovery(domain: &str, wordlist: Option<&Path>, cap: usize, brute: &dyn BruteResolver) -> Vec<String> {
    let Some(wordlist) = wordlist else {
        tracing::info!("no wordlist given, brute-force discovery skipped");
        return Vec::new();
    };
    if !brute.available() {
        tracing::warn!("brute-force discovery skipped: {}", ReconError::tool_absent(brute.name()));
        return Vec::new();
    }
    let fqdns = match brute_candidates(domain, wordlist, cap) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("brute-force discovery skipped: {}", e);
            return Vec::new();
        }
    };
    tracing::debug!("resolving {} brute-force candidates", fqdns.len());
    match brute.resolve(&fqdns).await {
        Ok(lines) => merge_candidates(first_fields(&lines)),
        Err(e) => {
            tracing::warn!("brute-force discovery failed: {}", e);
            Vec::new()
        }
    }
}

/// Run both discovery sources and persist each list plus the merged set.
pub async fn resolve_targets(
    ctx: &RunContext,
    wordlist: Option<&Path>,
    brute_cap: usize,
    passive: &dyn PassiveEnumerator,
    brute: &dyn BruteResolver,
) -> Result<ResolvedTargets, ReconError> {
    let passive_found = passive_discovery(&ctx.domain, passive).await;
    let brute_found = brute_discovery(&ctx.domain, wordlist, brute_cap, brute).await;

    let candidates = merge_candidates(passive_found.iter().chain(brute_found.iter()));

    ctx.write_lines(&ctx.passive_path(), &passive_found)?;
    ctx.write_lines(&ctx.brute_path(), &brute_found)?;
    ctx.write_lines(&ctx.subdomains_path(), &candidates)?;

    tracing::info!(passive = passive_found.len(), brute = brute_found.len(), total = candidates.len(), "targets resolved");
    Ok(ResolvedTargets { passive: passive_found, brute: brute_found, candidates })
}
