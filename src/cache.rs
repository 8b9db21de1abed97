//! In-process caching with a day-boundary expiry
//!
//! Entries written during a UTC day stay valid until the next UTC midnight.
//! Nothing invalidates them earlier, so a change pushed to a template
//! repository is picked up the following day at the latest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Source of the current time, injected so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The first instant of the UTC day after `now`.
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Key/value cache collaborator.
pub trait KeyValueCache<V>: Send + Sync {
    /// The cached value for `key`, or `None` on a miss or expired entry.
    fn get(&self, key: &str) -> Result<Option<V>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: V) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Cache whose entries expire at the next UTC midnight after they were set.
///
/// Clones share the same underlying map.
#[derive(Clone)]
pub struct MidnightCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MidnightCache<V> {
    /// Create a new empty cache on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Get the number of live entries
    pub fn len(&self) -> Result<usize> {
        let now = self.clock.now();
        let entries = self.lock()?;
        Ok(entries.values().filter(|e| e.expires_at > now).count())
    }

    /// Check if cache holds no live entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Clear all cached entries
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>>> {
        self.entries.lock().map_err(|_| Error::LockPoisoned {
            context: "midnight cache".to_string(),
        })
    }
}

impl<V: Clone> Default for MidnightCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> KeyValueCache<V> for MidnightCache<V> {
    fn get(&self, key: &str) -> Result<Option<V>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let live = match entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.expires_at > now,
        };
        if live {
            Ok(entries.get(key).map(|entry| entry.value.clone()))
        } else {
            entries.remove(key);
            Ok(None)
        }
    }

    fn set(&self, key: &str, value: V) -> Result<()> {
        let expires_at = next_utc_midnight(self.clock.now());
        self.lock()?
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }
}
