//! Admission control: accept or reject a request before business logic runs.
//!
//! Every guarded operation derives a stable key from the operation name, the
//! caller's origin, and the caller's identity, then asks the bucket store for
//! a fixed-window admit decision. Policies are configuration, not limiter
//! internals.

pub mod buckets;

pub use buckets::{BucketStore, Decision};

use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

/// Identity component for callers that have not authenticated. All anonymous
/// traffic from one origin shares a bucket per operation.
pub const ANONYMOUS: &str = "anonymous";

/// Origin component used once the caller is authenticated: the bucket is then
/// keyed by account id alone, so one account cannot widen its quota by
/// spreading requests across origins.
const SHARED_ORIGIN: &str = "account";

/// Key segment kept from the upstream guard format; fixed per deployment.
const KEY_SUFFIX: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RatePolicy {
    #[must_use]
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
        }
    }
}

/// Per-operation quotas for the guarded endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicies {
    pub login: RatePolicy,
    pub register: RatePolicy,
    pub refresh: RatePolicy,
    pub user_admin: RatePolicy,
}

impl Default for RatePolicies {
    fn default() -> Self {
        Self {
            login: RatePolicy::per_minute(5),
            register: RatePolicy::per_minute(5),
            refresh: RatePolicy::per_minute(10),
            user_admin: RatePolicy::per_minute(30),
        }
    }
}

/// `operation:suffix:origin:identity`, collapsed to a fixed-size opaque key
/// with a one-way digest.
#[must_use]
pub fn derive_key(operation: &str, origin: &str, identity: &str) -> String {
    let identifier = format!("{operation}:{KEY_SUFFIX}:{origin}:{identity}");
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// Key for an inbound request. Unauthenticated callers are bucketed per
/// origin under the `anonymous` identity; authenticated callers get one
/// bucket per account regardless of origin.
#[must_use]
pub fn request_key(operation: &str, origin: &str, account: Option<Uuid>) -> String {
    match account {
        Some(id) => derive_key(operation, SHARED_ORIGIN, &id.to_string()),
        None => derive_key(operation, origin, ANONYMOUS),
    }
}
