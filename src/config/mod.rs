//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ArbiterConfig (validated, immutable)
//!     → bootstrap nodes, rules, loop cadence
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new rule set handed to the rule engine
//! ```
//!
//! # Design Decisions
//! - Only rules are hot-reloaded; nodes and timings need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ArbiterConfig, EvaluationConfig, MonitorConfig, NodeConfig, ObservabilityConfig,
    ProbeConfig, StrategyConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
