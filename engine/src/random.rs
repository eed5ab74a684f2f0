//! Random process utilities.
//!
//! Every generator draws from an explicit [`SimRng`] so that a fixed seed
//! reproduces a data set exactly. The helpers here never panic: degenerate
//! ranges collapse to their lower bound and an empty choice yields `None`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use uuid::Uuid;

/// Seedable random source shared by all generators.
///
/// # Example
///
/// ```
/// use engine::random::SimRng;
///
/// let mut a = SimRng::seeded(7);
/// let mut b = SimRng::seeded(7);
/// assert_eq!(a.trace_id(), b.trace_id());
/// ```
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    /// Creates a deterministic random source from a seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a random source seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Creates a seeded source when a seed is given, an entropy source otherwise.
    #[must_use]
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Uniform float in `[min, max)`. Returns `min` when the range is empty.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + self.uniform() * (max - min)
    }

    /// Uniform integer in `[min, max]`. Returns `min` when `max <= min`.
    pub fn random_int(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Uniform 64-bit integer in `[min, max]`. Returns `min` when `max <= min`.
    pub fn random_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Right-skewed sample in `[min, max]`, biased toward `min`.
    ///
    /// Computes `min + exp(-5u) * (max - min)`: usually fast, occasionally slow.
    pub fn exponential(&mut self, min: f64, max: f64) -> f64 {
        let u = self.uniform();
        min + (-5.0 * u).exp() * (max - min)
    }

    /// Normally distributed sample.
    ///
    /// A negative or non-finite `stddev` yields `mean`.
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        match Normal::new(mean, stddev) {
            Ok(normal) => normal.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Picks an item with probability proportional to its weight.
    ///
    /// Walks the cumulative weight until the draw falls below the running sum.
    /// If floating point rounding leaves nothing selected the last item wins.
    /// Returns `None` only for an empty slice.
    pub fn weighted_choice<'a, T>(&mut self, items: &'a [(T, f64)]) -> Option<&'a T> {
        let total: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
        let draw = self.uniform() * total;
        let mut cumulative = 0.0;
        for (item, weight) in items {
            cumulative += weight.max(0.0);
            if draw < cumulative {
                return Some(item);
            }
        }
        items.last().map(|(item, _)| item)
    }

    /// Picks one item uniformly.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.inner.gen_range(0..items.len());
        items.get(index)
    }

    /// Random version 4 UUID drawn from this source.
    pub fn uuid(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.inner.gen()).into_uuid()
    }

    /// 32 lowercase hex characters, the W3C trace ID width.
    pub fn trace_id(&mut self) -> String {
        let bytes: [u8; 16] = self.inner.gen();
        hex::encode(bytes)
    }

    /// 16 lowercase hex characters, the W3C span ID width.
    pub fn span_id(&mut self) -> String {
        let bytes: [u8; 8] = self.inner.gen();
        hex::encode(bytes)
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Clamps `value` into `[min, max]`.
///
/// Unlike [`f64::clamp`] this never panics; an inverted range resolves to `max`.
#[must_use]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
