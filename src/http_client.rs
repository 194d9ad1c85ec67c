use reqwest::{Client, ClientBuilder};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The two clients a run needs.
#[derive(Clone)]
pub struct HttpClients {
    /// Follows redirects; used for page fetches
    pub fetch: Client,
    /// Never follows redirects; used for status probes and samples
    pub probe: Client,
}

impl HttpClients {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            fetch: client_builder(timeout, true).build()?,
            // samples must be raw bytes; a truncated gzip body would not decode
            probe: client_builder(timeout, false).no_gzip().no_brotli().build()?,
        })
    }
}

/// Base builder shared by both clients. Callers may add DNS overrides before `build()`.
pub fn client_builder(timeout: Duration, follow_redirects: bool) -> ClientBuilder {
    let redirect = if follow_redirects {
        reqwest::redirect::Policy::limited(5)
    } else {
        reqwest::redirect::Policy::none()
    };

    ClientBuilder::new()
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))

        .gzip(true)
        .brotli(true)

        .use_rustls_tls()
        .https_only(false)
        .redirect(redirect)
        .user_agent(USER_AGENT)

        // Embedded camera firmware almost always serves self-signed certificates
        .danger_accept_invalid_certs(true)
}
