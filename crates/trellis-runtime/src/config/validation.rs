//! Configuration validation utilities.

use std::collections::BTreeMap;

use trellis_core::DiagnosticKind;

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    DiagnosticsConfig, LogFormat, LogOutput, LoggingConfig, PlannerConfig, ReportLevel,
    TrellisConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &TrellisConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_planner_config(&config.planner)?;
    validate_diagnostics_config(&config.diagnostics)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is 'file'",
        ));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format 'json' requires the json-log feature",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty target: {target:?}"
        )));
    }

    Ok(())
}

/// Validates planner configuration.
fn validate_planner_config(planner: &PlannerConfig) -> ConfigResult<()> {
    if let Some(assembly) = &planner.consuming_assembly
        && assembly.trim().is_empty()
    {
        return Err(ConfigError::validation(
            "planner.consuming_assembly must not be empty when set",
        ));
    }
    Ok(())
}

/// Validates diagnostics configuration.
fn validate_diagnostics_config(diagnostics: &DiagnosticsConfig) -> ConfigResult<()> {
    let overrides = resolve_overrides(diagnostics)?;
    if overrides.get(&DiagnosticKind::CircularDependency) == Some(&ReportLevel::Suppressed) {
        return Err(ConfigError::validation(
            "CircularDependency cannot be suppressed",
        ));
    }
    Ok(())
}

/// Parses the override table into typed kinds.
///
/// Two spellings of the same kind are rejected rather than silently merged.
pub fn resolve_overrides(
    diagnostics: &DiagnosticsConfig,
) -> ConfigResult<BTreeMap<DiagnosticKind, ReportLevel>> {
    let mut resolved = BTreeMap::new();
    for (name, level) in &diagnostics.overrides {
        let kind: DiagnosticKind = name.parse()?;
        if resolved.insert(kind, *level).is_some() {
            return Err(ConfigError::validation(format!(
                "diagnostics.overrides sets {kind} more than once"
            )));
        }
    }
    Ok(resolved)
}
