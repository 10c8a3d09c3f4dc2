//! Self-correcting weighted bucket sampler.
//!
//! Two counters, `old` and `new`, always sum to 100. A request is selected
//! when `new > old`; each decision moves weight between the counters so the
//! selection rate converges to `weight%` without long streaks.
//!
//! ```text
//! selected: new -= 100 - w; old += 100 - w
//! skipped:  new += w;       old -= w
//! ```
//!
//! `new` stays within `(-50, 150]`, so the counters never drift and need no
//! renormalization. Resetting them to `(w, 100 - w)` whenever one reaches 100
//! drops the pending decision: with `w = 50` it never selects at all.

use std::sync::{Mutex, PoisonError};

use crate::sampling::{SamplingError, SamplingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    old_weight: i32,
    new_weight: i32,
}

impl Counters {
    fn initial(weight: i32) -> Self {
        Self {
            old_weight: 100 - weight,
            new_weight: weight,
        }
    }
}

/// Weighted bucket sampler. Deterministic from its starting state.
#[derive(Debug)]
pub struct WeightedBucket {
    weight: i32,
    counters: Mutex<Counters>,
}

impl WeightedBucket {
    /// Create a sampler that selects `weight` percent of requests.
    pub fn new(weight: u8) -> Result<Self, SamplingError> {
        if weight > 100 {
            return Err(SamplingError::WeightOutOfRange(weight));
        }
        let weight = i32::from(weight);
        Ok(Self {
            weight,
            counters: Mutex::new(Counters::initial(weight)),
        })
    }
}

impl SamplingPolicy for WeightedBucket {
    fn decide(&self) -> bool {
        // The update below cannot panic, so a poisoned lock still holds valid counters.
        let mut c = self.counters.lock().unwrap_or_else(PoisonError::into_inner);

        let selected = c.new_weight > c.old_weight;
        if selected {
            c.new_weight -= 100 - self.weight;
            c.old_weight += 100 - self.weight;
        } else {
            c.new_weight += self.weight;
            c.old_weight -= self.weight;
        }

        debug_assert_eq!(c.old_weight + c.new_weight, 100);
        selected
    }

    fn percentage(&self) -> u8 {
        self.weight as u8
    }
}
