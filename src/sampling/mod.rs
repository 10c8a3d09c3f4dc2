//! Sampling subsystem.
//!
//! # Data Flow
//! ```text
//! Primary response written
//!     → SamplingPolicy::decide()
//!         - weighted.rs (self-correcting bucket, bounded streaks)
//!         - counter.rs (request counter modulo 100)
//!     → true: enqueue shadow job / false: done
//! ```
//!
//! # Design Decisions
//! - Policy selected once at startup, shared via Arc
//! - `decide()` takes no input; state is internal and synchronized
//! - Both policies are deterministic, so tests can assert exact sequences

pub mod counter;
pub mod weighted;

use std::sync::Arc;

use crate::config::{SamplingConfig, SamplingPolicyKind};

pub use counter::CounterSampler;
pub use weighted::WeightedBucket;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplingError {
    #[error("sampling weight {0} is outside 0..=100")]
    WeightOutOfRange(u8),
}

/// Decides, per request, whether it is shadowed.
pub trait SamplingPolicy: Send + Sync + std::fmt::Debug {
    /// Returns true if the current request should be shadowed.
    fn decide(&self) -> bool;

    /// Configured target percentage.
    fn percentage(&self) -> u8;
}

/// Build the policy described by `config`.
pub fn from_config(config: &SamplingConfig) -> Result<Arc<dyn SamplingPolicy>, SamplingError> {
    Ok(match config.policy {
        SamplingPolicyKind::Weighted => Arc::new(WeightedBucket::new(config.percentage)?),
        SamplingPolicyKind::Counter => Arc::new(CounterSampler::new(config.percentage)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_policy() {
        for policy in [SamplingPolicyKind::Weighted, SamplingPolicyKind::Counter] {
            let sampler = from_config(&SamplingConfig {
                percentage: 40,
                policy,
            })
            .unwrap();
            assert_eq!(sampler.percentage(), 40);
            let selected = (0..1_000).filter(|_| sampler.decide()).count();
            assert_eq!(selected, 400, "{policy:?}");
        }
    }
}
