use std::path::PathBuf;

use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Settings shared by `scan` and `catalog`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// JSON file with scan settings (fields missing from the file keep their defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replace the endpoint catalog with a newline-delimited path list
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Replace the media signatures with a newline-delimited list
    #[arg(long, value_name = "FILE")]
    pub signatures: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the reconnaissance pipeline against a domain
    Scan {
        /// Target domain (e.g. example.org); a URL is reduced to its host
        domain: String,

        /// Subdomain prefixes for brute-force discovery
        #[arg(short = 'w', long, value_name = "FILE")]
        wordlist: Option<PathBuf>,

        /// Output root; each run gets its own directory below it
        #[arg(short = 'o', long, default_value = "./results")]
        out: PathBuf,

        /// Ports to probe (default: 80,443,8000,8080,8443,9000)
        #[arg(short = 'p', long)]
        ports: Option<String>,

        /// Politeness delay between requests in ms (default: 250)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Request timeout in seconds (default: 6)
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum bytes kept per endpoint sample (default: 102400)
        #[arg(long)]
        sample_cap: Option<usize>,

        /// Maximum wordlist entries used for brute force (default: 20000)
        #[arg(long)]
        brute_cap: Option<usize>,

        /// Concurrent requests across all hosts (default: 1, sequential)
        #[arg(short = 'c', long)]
        concurrency: Option<u16>,

        /// Concurrent requests against one host (default: 1)
        #[arg(long)]
        per_host: Option<u16>,

        /// Do not verify discovered streams
        #[arg(long, default_value_t = false)]
        no_streams: bool,

        /// Confirm you are authorized to assess this domain (required)
        #[arg(long, default_value_t = false)]
        authorized: bool,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the endpoint catalog and media signatures in effect
    Catalog {
        #[command(flatten)]
        data: DataArgs,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
