//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trellis_core::DiagnosticKind;
use trellis_planner::PlannerOptions;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TrellisConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Planner behaviour.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Diagnostic reporting.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity, most verbose first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Install a subscriber at all. Off leaves global state untouched.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Level for the planner's own targets.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Log the duration of each planning pass.
    #[serde(default)]
    pub span_timings: bool,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,

    /// Per-target levels, e.g. `trellis_planner = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            span_timings: false,
            thread_ids: false,
            file_location: false,
            filters: BTreeMap::new(),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

// =============================================================================
// Planner
// =============================================================================

/// Planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Assembly that constructs the planned services; enables accessibility
    /// checks when set.
    #[serde(default)]
    pub consuming_assembly: Option<String>,

    /// Treat explicitly duplicated plugin orders as errors.
    #[serde(default)]
    pub strict_plugin_order: bool,
}

impl PlannerConfig {
    /// Converts to planner options.
    pub fn to_options(&self) -> PlannerOptions {
        PlannerOptions {
            consuming_assembly: self.consuming_assembly.clone(),
            strict_plugin_order: self.strict_plugin_order,
        }
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Reporting level for one diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Warning,
    Info,
    /// Never reported.
    Suppressed,
}

impl ReportLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic reporting configuration.
///
/// ```toml
/// [diagnostics]
/// warnings_as_errors = false
///
/// [diagnostics.overrides]
/// lifetime_mismatch = "error"
/// no_implementations_for_collection = "suppressed"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Per-kind reporting levels replacing the built-in severity, keyed by
    /// kind name (`circular_dependency` or `CircularDependency`).
    #[serde(default)]
    pub overrides: BTreeMap<String, ReportLevel>,

    /// Report every warning as an error.
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl DiagnosticsConfig {
    /// Sets the reporting level of `kind`.
    pub fn with_override(mut self, kind: DiagnosticKind, level: ReportLevel) -> Self {
        self.overrides.insert(kind.as_str().to_string(), level);
        self
    }
}
