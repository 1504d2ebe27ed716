//! Shared primitives: the thread-local PRNG and atomic floating point.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

thread_local! {
    static THREAD_RNG: RefCell<ChaCha20Rng> = RefCell::new(ChaCha20Rng::from_entropy());
}

/// Run `f` with this thread's PRNG.
///
/// Each thread gets its own ChaCha20 generator, seeded from the OS entropy
/// source on first use, so worker threads never contend on a shared RNG.
pub fn with_rng<T>(f: impl FnOnce(&mut ChaCha20Rng) -> T) -> T {
    THREAD_RNG.with(|rng| f(&mut rng.borrow_mut()))
}

/// Pick a uniformly random element of `items`, or `None` if it is empty.
pub fn random_element<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        with_rng(|rng| items.get(rng.gen_range(0..items.len())))
    }
}

/// An `f64` updated with sequentially consistent atomic operations.
///
/// Node scores and probabilities are written by every worker during
/// backpropagation; a compare-exchange loop over the bit pattern keeps those
/// updates lock-free.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }

    /// Add `value`, returning the previous value.
    pub fn fetch_add(&self, value: f64) -> f64 {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return f64::from_bits(current),
                Err(actual) => current = actual,
            }
        }
    }
}
