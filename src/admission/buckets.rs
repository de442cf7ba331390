//! Fixed-window counters behind a sharded keyed map.
//!
//! The increment-and-compare for one key is a single locked read-modify-write,
//! so two concurrent requests can never both squeeze through the last slot.
//! Keys hash across shards so unrelated identities do not contend on one
//! global lock. Buckets are never explicitly destroyed; a stale bucket resets
//! itself on the first admit after its window has elapsed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::RatePolicy;

const SHARD_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Throttled,
}

#[derive(Debug)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct BucketStore {
    shards: Vec<Mutex<HashMap<String, Bucket>>>,
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    pub fn admit(&self, key: &str, policy: RatePolicy) -> Decision {
        self.admit_at(key, policy, Instant::now())
    }

    fn admit_at(&self, key: &str, policy: RatePolicy, now: Instant) -> Decision {
        let mut shard = self.shard(key);
        let bucket = shard.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= policy.window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        // The increment is not rolled back on a throttle: a caller that keeps
        // hammering stays throttled for the rest of the window.
        bucket.count += 1;
        if bucket.count > policy.limit {
            Decision::Throttled
        } else {
            Decision::Admitted
        }
    }

    fn shard(&self, key: &str) -> MutexGuard<'_, HashMap<String, Bucket>> {
        let index = key.as_bytes().first().copied().unwrap_or(0) as usize % SHARD_COUNT;
        match self.shards[index].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current count for a key, if a bucket exists. Test hook.
    #[cfg(test)]
    fn count(&self, key: &str) -> Option<u32> {
        self.shard(key).get(key).map(|b| b.count)
    }
}
