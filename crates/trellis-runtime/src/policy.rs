//! Diagnostic reporting policy.
//!
//! The planner always attaches every diagnostic at its built-in severity.
//! A [`DiagnosticPolicy`] decides how each one is *reported*: overrides can
//! raise, lower or suppress a kind, and `warnings_as_errors` promotes what
//! remains at warning level. The plan itself is never altered; only the
//! [`DiagnosticReport`] and the build verdict change.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, warn};
use trellis_core::{Diagnostic, DiagnosticKind, DiagnosticLog, Severity};

use crate::config::{ConfigResult, DiagnosticsConfig, ReportLevel, resolve_overrides};

/// Resolved per-kind reporting levels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticPolicy {
    overrides: BTreeMap<DiagnosticKind, ReportLevel>,
    warnings_as_errors: bool,
}

impl DiagnosticPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DiagnosticsConfig) -> ConfigResult<Self> {
        Ok(Self {
            overrides: resolve_overrides(config)?,
            warnings_as_errors: config.warnings_as_errors,
        })
    }

    pub fn with_override(mut self, kind: DiagnosticKind, level: ReportLevel) -> Self {
        self.overrides.insert(kind, level);
        self
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// The level `diagnostic` is reported at.
    pub fn level_for(&self, diagnostic: &Diagnostic) -> ReportLevel {
        let level = self
            .overrides
            .get(&diagnostic.kind)
            .copied()
            .unwrap_or(match diagnostic.severity {
                Severity::Error => ReportLevel::Error,
                Severity::Warning => ReportLevel::Warning,
                Severity::Info => ReportLevel::Info,
            });
        if self.warnings_as_errors && level == ReportLevel::Warning {
            ReportLevel::Error
        } else {
            level
        }
    }

    /// Applies the policy to `log`.
    pub fn report(&self, log: &DiagnosticLog) -> DiagnosticReport {
        let mut entries = Vec::with_capacity(log.len());
        let mut suppressed = 0;
        for diagnostic in log {
            match self.level_for(diagnostic) {
                ReportLevel::Suppressed => suppressed += 1,
                level => entries.push(ReportedDiagnostic {
                    level,
                    diagnostic: diagnostic.clone(),
                }),
            }
        }
        DiagnosticReport {
            entries,
            suppressed,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// A diagnostic with the level it is reported at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedDiagnostic {
    pub level: ReportLevel,
    pub diagnostic: Diagnostic,
}

/// The reported view of a plan's diagnostics, in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    entries: Vec<ReportedDiagnostic>,
    suppressed: usize,
}

impl DiagnosticReport {
    pub fn entries(&self) -> &[ReportedDiagnostic] {
        &self.entries
    }

    pub fn count(&self, level: ReportLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// Number of diagnostics hidden by a `suppressed` override.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Whether anything is reported at error level.
    pub fn fails_build(&self) -> bool {
        self.entries.iter().any(|e| e.level == ReportLevel::Error)
    }

    /// Emits every entry as a tracing event at its reported level.
    pub fn log(&self) {
        for entry in &self.entries {
            let d = &entry.diagnostic;
            match entry.level {
                ReportLevel::Error => error!(kind = %d.kind, "{}", d.message),
                ReportLevel::Warning => warn!(kind = %d.kind, "{}", d.message),
                ReportLevel::Info | ReportLevel::Suppressed => {
                    info!(kind = %d.kind, "{}", d.message)
                }
            }
        }
    }
}
