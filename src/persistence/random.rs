//! The one source of randomness for the engine.
//!
//! Identifiers (uids, `uuid` and `nanoid` columns) and generated samples all
//! draw from a [`RandomSource`]. A schema owns one and hands clones of it to
//! every table, data table and row created against it, so seeding the schema
//! makes the whole engine reproducible.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::Value;
use uuid::Builder;

/// Default length of a `nanoid` value when the type tag carries no size.
pub const NANOID_DEFAULT_SIZE: usize = 21;

/// The url-safe alphabet used for `nanoid` values.
pub const NANOID_ALPHABET: &[u8; 64] =
    b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A cloneable handle to a shared pseudorandom generator.
///
/// Clones share the same generator state.
#[derive(Clone)]
pub struct RandomSource {
    rng: Arc<Mutex<StdRng>>,
}

impl RandomSource {
    pub fn from_entropy() -> RandomSource {
        RandomSource {
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn seeded(seed: u64) -> RandomSource {
        //! A deterministic source, two sources with the same seed yield the
        //! same sequence of identifiers and samples.

        RandomSource {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    pub fn uuid(&self) -> String {
        //! A random (version 4) uuid in its hyphenated 36 character form.

        let mut bytes = [0u8; 16];
        self.with_rng(|rng| rng.fill_bytes(&mut bytes));
        Builder::from_random_bytes(bytes).into_uuid().to_string()
    }

    pub fn nanoid(&self, size: usize) -> String {
        self.with_rng(|rng| {
            (0..size)
                .map(|_| NANOID_ALPHABET[rng.gen_range(0..NANOID_ALPHABET.len())] as char)
                .collect()
        })
    }

    pub fn pick(&self, values: &[Value]) -> Option<Value> {
        //! Uniformly pick one of `values`, [`None`] when there is nothing to pick.

        if values.is_empty() {
            return None;
        }
        self.with_rng(|rng| Some(values[rng.gen_range(0..values.len())].clone()))
    }

    pub fn int_between(&self, low: i64, high: i64) -> i64 {
        //! Uniform integer in `low..=high`, bounds given in any order.

        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.with_rng(|rng| rng.gen_range(low..=high))
    }

    pub fn float_between(&self, low: f64, high: f64) -> f64 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.with_rng(|rng| rng.gen_range(low..=high))
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        RandomSource::from_entropy()
    }
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RandomSource")
    }
}
