//! Time-windowed cache of generated values.
//!
//! Values are created lazily on first request for a window. Concurrent first
//! requests for the same window share a per-window slot mutex, so the
//! generator runs once. Inserting a window evicts every older one.

use crate::config::ConfigError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur while reading through the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to acquire a cache lock.
    #[error("Failed to acquire lock on window cache")]
    LockPoisoned,

    /// The generator rejected its configuration.
    #[error("Generation failed: {0}")]
    Generation(#[from] ConfigError),
}

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Caches one value per time window of fixed length.
///
/// # Example
///
/// ```
/// use engine::cache::WindowCache;
/// use chrono::{Duration, Utc};
///
/// let cache: WindowCache<u32> = WindowCache::new(Duration::minutes(5));
/// let now = Utc::now();
/// let first = cache.get_or_generate(now, || Ok(7)).unwrap();
/// let second = cache.get_or_generate(now, || Ok(8)).unwrap();
/// assert_eq!((*first, *second), (7, 7));
/// ```
#[derive(Debug)]
pub struct WindowCache<T> {
    window_ms: i64,
    slots: Mutex<HashMap<i64, Slot<T>>>,
}

impl<T> WindowCache<T> {
    /// Creates an empty cache. Windows shorter than a millisecond are
    /// widened to one millisecond.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.num_milliseconds().max(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Window index of `at`: `floor(at / window)`.
    #[must_use]
    pub fn window_of(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp_millis().div_euclid(self.window_ms)
    }

    /// Number of windows currently held, including ones being generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.slots.lock().map_err(|_| CacheError::LockPoisoned)?.len())
    }

    /// True if no window is held.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Returns the value for the window containing `at`, generating it on
    /// first request.
    ///
    /// A failed or panicked generation leaves the window empty, so the next
    /// request retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the window map lock is poisoned or the generator
    /// fails.
    pub fn get_or_generate<F>(&self, at: DateTime<Utc>, generate: F) -> Result<Arc<T>, CacheError>
    where
        F: FnOnce() -> Result<T, ConfigError>,
    {
        let window = self.window_of(at);
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| CacheError::LockPoisoned)?;
            if !slots.contains_key(&window) {
                let before = slots.len();
                slots.retain(|w, _| *w >= window);
                if slots.len() < before {
                    tracing::debug!(window, evicted = before - slots.len(), "Evicted stale windows");
                }
            }
            Arc::clone(slots.entry(window).or_default())
        };

        // A generator that panicked left the slot empty, so the next caller retries.
        let mut value = slot.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(window, "Recovered cache window after a panicked generation");
            poisoned.into_inner()
        });
        if let Some(existing) = value.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let generated = Arc::new(generate()?);
        *value = Some(Arc::clone(&generated));
        tracing::debug!(window, "Populated cache window");
        Ok(generated)
    }

    /// Drops every cached window.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.slots.lock().map_err(|_| CacheError::LockPoisoned)?.clear();
        Ok(())
    }
}
