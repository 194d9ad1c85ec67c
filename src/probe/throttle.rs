use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Instant};

use crate::error::ReconError;

/// A permit that holds both global and per-host semaphore permits.
pub struct ThrottlePermit {
    _global: OwnedSemaphorePermit,
    _host: OwnedSemaphorePermit,
}

/// Hands out the next free start time, spaced `interval` apart.
struct Pacer {
    next: Mutex<Instant>,
    interval: Duration,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self { next: Mutex::new(Instant::now()), interval }
    }

    async fn wait_turn(&self) {
        let at = {
            let mut next = self.next.lock().await;
            let at = (*next).max(Instant::now());
            *next = at + self.interval;
            at
        };
        sleep_until(at).await;
    }
}

/// Politeness gate for outgoing requests.
///
/// Caps concurrent requests globally and per host, keeps at least `delay`
/// between two requests to the same host, and paces all requests at
/// `delay / global_limit` so a single worker sees exactly `delay` between requests.
pub struct Throttle {
    global: Arc<Semaphore>,
    global_pace: Pacer,
    per_host: DashMap<String, Arc<Semaphore>>,
    host_pace: DashMap<String, Arc<Pacer>>,
    default_per_host: usize,
    delay: Duration,
}

impl Throttle {
    pub fn new(global_limit: usize, default_per_host: usize, delay: Duration) -> Self {
        let global_limit = global_limit.max(1);
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            global_pace: Pacer::new(delay / global_limit as u32),
            per_host: DashMap::new(),
            host_pace: DashMap::new(),
            default_per_host: default_per_host.max(1),
            delay,
        }
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        self.per_host
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.default_per_host)))
            .value()
            .clone()
    }

    fn host_pacer(&self, host: &str) -> Arc<Pacer> {
        self.host_pace
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Pacer::new(self.delay)))
            .value()
            .clone()
    }

    /// Wait for capacity and for this host's turn. Hold the permit for the request's lifetime.
    pub async fn acquire(&self, host: &str) -> Result<ThrottlePermit, ReconError> {
        let host_sem = self.host_semaphore(host);
        // Acquire global then host
        let gperm = self.global.clone().acquire_owned().await.map_err(closed)?;
        let hperm = host_sem.acquire_owned().await.map_err(closed)?;
        self.host_pacer(host).wait_turn().await;
        self.global_pace.wait_turn().await;
        Ok(ThrottlePermit { _global: gperm, _host: hperm })
    }
}

fn closed(_: tokio::sync::AcquireError) -> ReconError {
    ReconError::Interrupted("throttle closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn single_worker_waits_delay_between_requests() {
        let throttle = Throttle::new(1, 1, Duration::from_millis(250));
        let start = Instant::now();
        for host in ["a", "b", "c"] {
            let _p = throttle.acquire(host).await.unwrap();
        }
        // first request is immediate, the two after it wait a full delay each
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn same_host_keeps_delay_under_concurrency() {
        let throttle = Arc::new(Throttle::new(4, 4, Duration::from_millis(400)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let t = throttle.clone();
            handles.push(tokio::spawn(async move {
                let _p = t.acquire("cam.example.org").await.unwrap();
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for h in handles {
            times.push(h.await.unwrap().duration_since(start));
        }
        times.sort();
        assert!(times[1] - times[0] >= Duration::from_millis(400));
        assert!(times[2] - times[1] >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn closed_gate_is_an_interruption() {
        let sem = Semaphore::new(0);
        sem.close();
        let err = closed(sem.acquire().await.unwrap_err());
        assert!(matches!(err, ReconError::Interrupted(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn different_hosts_share_global_pace() {
        let throttle = Throttle::new(4, 1, Duration::from_millis(400));
        let start = Instant::now();
        for host in ["a", "b", "c", "d", "e"] {
            let _p = throttle.acquire(host).await.unwrap();
        }
        // 400ms / 4 workers = 100ms global spacing
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }
}
