//! Counter-modulo sampling.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sampling::{SamplingError, SamplingPolicy};

/// Selects request `n` iff `n % 100 < percentage`.
///
/// Exact over every window of 100 requests, but selections arrive in one
/// burst at the start of each window.
#[derive(Debug)]
pub struct CounterSampler {
    percentage: u64,
    counter: AtomicU64,
}

impl CounterSampler {
    pub fn new(percentage: u8) -> Result<Self, SamplingError> {
        if percentage > 100 {
            return Err(SamplingError::WeightOutOfRange(percentage));
        }
        Ok(Self {
            percentage: u64::from(percentage),
            counter: AtomicU64::new(0),
        })
    }
}

impl SamplingPolicy for CounterSampler {
    fn decide(&self) -> bool {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        n % 100 < self.percentage
    }

    fn percentage(&self) -> u8 {
        self.percentage as u8
    }
}
