//! Layered configuration for the planner runtime.
//!
//! Covers logging, planner options and diagnostic reporting. Sources are
//! merged by [`ConfigLoader`] and checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLayer, ConfigLoader, PROFILE_ENV, load_config, load_config_from_file};
pub use schema::{
    DiagnosticsConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PlannerConfig, ReportLevel,
    TrellisConfig,
};
pub use validation::{resolve_overrides, validate_config};
