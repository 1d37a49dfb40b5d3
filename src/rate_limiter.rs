//! Token-bucket rate limiting for the snapshot-write and restore-read paths
//! (spec §4.2).
//!
//! Shaped after the teacher crate's stream wrappers (`ChecksumReader`,
//! `ChecksumWriter` in `src/backup/checksum_reader.rs` / `data_blob.rs`),
//! which tap every byte passing through a plain reader/writer. Here the tap
//! feeds a token bucket instead of a hasher: [`RateLimiter::acquire`] is the
//! suspension point callers pause on before moving `n_bytes`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A single token bucket. A rate of `<= 0` bytes/sec means "no limiter
/// installed"; [`RateLimiter::new`] returns `None` in that case so callers
/// can skip the acquire/pause machinery entirely on the hot path.
pub struct RateLimiter {
    rate_bytes_per_sec: f64,
    burst_bytes: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    available: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Construct a limiter for the given byte rate. Returns `None` when
    /// `rate_bytes_per_sec <= 0`, per spec §4.2 / §6.4 ("a rate of zero or
    /// negative disables limiting").
    pub fn new(rate_bytes_per_sec: i64) -> Option<Self> {
        if rate_bytes_per_sec <= 0 {
            return None;
        }
        let rate = rate_bytes_per_sec as f64;
        Some(Self {
            rate_bytes_per_sec: rate,
            // one second worth of burst, a simple and common default
            burst_bytes: rate,
            state: Mutex::new(BucketState {
                available: rate,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Pace `n_bytes` through the bucket, blocking (sleeping) for however
    /// long the bucket is empty. Returns the duration actually paused;
    /// never fails the caller's request, only delays it.
    pub fn acquire(&self, n_bytes: u64) -> Duration {
        let mut paused = Duration::ZERO;
        let mut remaining = n_bytes as f64;

        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                self.refill_locked(&mut state);

                if state.available >= remaining {
                    state.available -= remaining;
                    remaining = 0.0;
                    None
                } else {
                    let take = state.available;
                    state.available = 0.0;
                    remaining -= take;
                    // time to accumulate enough tokens for what's left
                    let seconds_needed = remaining / self.rate_bytes_per_sec;
                    Some(Duration::from_secs_f64(seconds_needed.max(0.0)))
                }
            };

            match wait {
                None => break,
                Some(d) => {
                    let d = d.min(Duration::from_millis(250));
                    std::thread::sleep(d);
                    paused += d;
                    if remaining <= 0.0 {
                        break;
                    }
                }
            }
        }

        paused
    }

    fn refill_locked(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.available = (state.available + elapsed * self.rate_bytes_per_sec)
                .min(self.burst_bytes);
            state.last_refill = now;
        }
    }
}

/// Cumulative throttle-time counters surfaced as metrics (spec §4.2,
/// `snapshot_throttle_nanos` / `restore_throttle_nanos`). Increments use
/// atomic fetch-add so they're safe to update from concurrent snapshot
/// operations without a repository-wide lock.
#[derive(Default)]
pub struct ThrottleCounters {
    snapshot_nanos: AtomicU64,
    restore_nanos: AtomicU64,
}

impl ThrottleCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_snapshot_pause(&self, d: Duration) {
        self.snapshot_nanos
            .fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn add_restore_pause(&self, d: Duration) {
        self.restore_nanos
            .fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn snapshot_nanos(&self) -> u64 {
        self.snapshot_nanos.load(Ordering::Relaxed)
    }

    pub fn restore_nanos(&self) -> u64 {
        self.restore_nanos.load(Ordering::Relaxed)
    }
}
