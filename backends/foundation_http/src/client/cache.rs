//! Validator cache used to build conditional requests.
//!
//! The connector stores the `ETag` and `Last-Modified` validators of
//! cacheable responses under the request's canonical URL and replays them
//! as `If-None-Match`/`If-Modified-Since` on later requests for the same URL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Validators remembered for one URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Key/value store for validators. The connector is the only caller.
pub trait ValidatorCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Validators>;

    fn set(&self, key: &str, value: Validators, ttl: Duration);
}

/// Remembers nothing. Used when no cache is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValidatorCache;

impl ValidatorCache for NoopValidatorCache {
    fn get(&self, _key: &str) -> Option<Validators> {
        None
    }

    fn set(&self, _key: &str, _value: Validators, _ttl: Duration) {}
}

/// In-process cache with per-entry expiry. A TTL too large to add to the
/// current instant never expires.
#[derive(Debug, Default)]
pub struct MemoryValidatorCache {
    entries: Mutex<HashMap<String, (Option<Instant>, Validators)>>,
}

impl MemoryValidatorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValidatorCache for MemoryValidatorCache {
    fn get(&self, key: &str) -> Option<Validators> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((expires_at, validators)) if expires_at.is_none_or(|at| Instant::now() < at) => {
                Some(validators.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Validators, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now().checked_add(ttl), value));
        }
    }
}
