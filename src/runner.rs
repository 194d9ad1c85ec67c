use std::io::IsTerminal;

use anyhow::{bail, Context};

use crate::cli::{Cli, Commands, DataArgs};
use cam_recon::config::{parse_ports, read_list_file, ScanConfig};
use cam_recon::context::RunContext;
use cam_recon::external::Toolbox;
use cam_recon::http_client::HttpClients;
use cam_recon::pipeline::Pipeline;

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep external crates (reqwest/hyper) at INFO to avoid flooding the CLI.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!("cam_recon={level},reqwest=info,hyper=info,h2=info", level = crate_level);
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Catalog { data } => {
            let config = load_config(&data)?;
            println!("# endpoint catalog ({} paths)", config.catalog.len());
            for path in &config.catalog {
                println!("{}", path);
            }
            println!("\n# media signatures ({})", config.signatures.len());
            for sig in &config.signatures {
                println!("{}", sig);
            }
            Ok(())
        }
        Commands::Scan { domain, wordlist, out, ports, delay_ms, timeout, sample_cap, brute_cap, concurrency, per_host, no_streams, authorized, data } => {
            if !authorized {
                bail!("refusing to scan {}: pass --authorized to confirm you have permission to assess this domain", domain);
            }

            let mut config = load_config(&data)?;
            if let Some(p) = ports { config.ports = parse_ports(&p)?; }
            if let Some(v) = delay_ms { config.delay_ms = v; }
            if let Some(v) = timeout { config.timeout_secs = v.max(1); }
            if let Some(v) = sample_cap { config.sample_cap = v.max(1); }
            if let Some(v) = brute_cap { config.brute_cap = v; }
            if let Some(v) = concurrency { config.concurrency = v.max(1); }
            if let Some(v) = per_host { config.per_host = v.max(1); }
            if no_streams { config.verify_streams = false; }

            let domain = normalize_domain(&domain);
            if domain.is_empty() {
                bail!("empty target domain");
            }

            tracing::info!(domain=%domain, out=%out.display(), concurrency = config.concurrency, delay_ms = config.delay_ms, "Starting scan");
            println!("[>] Target: {}", domain);
            println!("[~] Delay: {}ms, timeout: {}s, concurrency: {} (per-host {})",
                config.delay_ms, config.timeout_secs, config.workers(), config.per_host);

            let ctx = RunContext::create(&out, &domain)?;
            println!("[+] Run directory: {}", ctx.run_dir.display());

            let tools = Toolbox::detect(&config);
            for (tool, present) in tools.availability() {
                if !present {
                    println!("[!] {} not found on PATH", tool);
                }
            }
            let clients = HttpClients::new(config.timeout()).context("building HTTP clients")?;

            println!("\n{}\n", "-".repeat(60));
            let pipeline = Pipeline::new(ctx, config, tools, clients, wordlist)?
                .with_progress(std::io::stderr().is_terminal());
            let summary = pipeline.run().await?;
            summary.print_summary();
            println!("[=] Detailed results saved to: {}", pipeline.context().run_dir.display());
            Ok(())
        }
    }
}

fn load_config(data: &DataArgs) -> anyhow::Result<ScanConfig> {
    let mut config = match &data.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(path) = &data.catalog {
        config.catalog = read_list_file(path, usize::MAX)?;
    }
    if let Some(path) = &data.signatures {
        config.signatures = read_list_file(path, usize::MAX)?;
    }
    Ok(config)
}

/// If the user passed a full URL, keep only the host.
fn normalize_domain(target: &str) -> String {
    let target = target.trim();
    let host = if target.starts_with("http://") || target.starts_with("https://") {
        match url::Url::parse(target) {
            Ok(u) => u.host_str().map(|s| s.to_string()).unwrap_or_else(|| target.to_string()),
            Err(_) => target.to_string(),
        }
    } else {
        target.to_string()
    };
    host.trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_reduce_to_host() {
        assert_eq!(normalize_domain("https://Example.org/path"), "example.org");
        assert_eq!(normalize_domain(" example.org. "), "example.org");
    }
}
