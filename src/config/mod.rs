//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to the relay, worker pool and sink at startup
//! ```
//!
//! # Design Decisions
//! - Config is loaded once; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ComparisonConfig, ElasticsearchConfig, LimitsConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProxyConfig, SamplingConfig, SamplingPolicyKind, StorageBackend,
    StorageConfig, TimeoutConfig, UpstreamConfig, UpstreamsConfig, WorkerConfig,
};
pub use validation::{validate_config, ValidationError};
