//! Trellis Runtime - orchestration layer for the Trellis registration planner.
//!
//! This crate provides:
//! - Layered configuration (`trellis.toml`, `trellis.yaml`, `TRELLIS_*`)
//! - Logging setup driven by that configuration
//! - Concurrent discovery of [`CandidateSource`](trellis_core::CandidateSource)s
//!   into a runtime-owned registry
//! - Diagnostic reporting policy (per-kind overrides, warnings as errors)
//!
//! ```ignore
//! use trellis_runtime::PlannerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = PlannerRuntime::builder().build()?;
//!     runtime.add_source(my_source());
//!
//!     let output = runtime.plan().await?;
//!     output.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod policy;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, TrellisConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingError;
pub use policy::{DiagnosticPolicy, DiagnosticReport, ReportedDiagnostic};
pub use runtime::{PlanOutput, PlannerRuntime, RuntimeBuilder};

pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ReportLevel, TrellisConfig};
    pub use crate::runtime::{PlanOutput, PlannerRuntime};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
