use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const NONCE_TTL: Duration = Duration::from_secs(5 * 60);
pub const NONCE_CAPACITY: usize = 100;

/// One-time values handed out with login redirects.
///
/// Entries expire after a fixed time. When the cache is full, the oldest
/// entry makes room for the new one.
pub struct NonceCache {
    entries: Mutex<VecDeque<(String, Instant)>>,
    capacity: usize,
    ttl: Duration,
}

impl NonceCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        NonceCache {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub async fn insert(&self, nonce: String) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|(_, inserted)| now.duration_since(*inserted) < self.ttl);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((nonce, now));
    }

    /// Remove a nonce, returning whether it was there and had not expired.
    pub async fn take(&self, nonce: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let pos = match entries.iter().position(|(n, _)| n == nonce) {
            Some(pos) => pos,
            None => return false,
        };
        match entries.remove(pos) {
            Some((_, inserted)) => inserted.elapsed() < self.ttl,
            None => false,
        }
    }
}

impl Default for NonceCache {
    fn default() -> Self {
        NonceCache::new(NONCE_CAPACITY, NONCE_TTL)
    }
}
