//! Candidate gathering and planning orchestration.
//!
//! ```rust,ignore
//! use trellis_runtime::PlannerRuntime;
//!
//! let mut runtime = PlannerRuntime::builder().profile("ci").build()?;
//! runtime.add_source(StaticSource::new("orders", orders::candidates()));
//! runtime.include_linked_contributors()?;
//!
//! let output = runtime.plan().await?;
//! std::fs::write("graph.json", output.export_json()?)?;
//! let plan = output.into_result()?;
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use trellis_core::{
    BoxedSource, CandidateRegistry, CandidateSource, CandidateType, Registration,
};
use trellis_planner::{GraphSnapshot, Planner, RegistrationPlan};

use crate::config::{ConfigLoader, ConfigResult, ReportLevel, TrellisConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::policy::{DiagnosticPolicy, DiagnosticReport};

/// Everything one planning run produces.
#[derive(Debug, Clone)]
pub struct PlanOutput {
    pub plan: RegistrationPlan,
    pub snapshot: GraphSnapshot,
    pub report: DiagnosticReport,
}

impl PlanOutput {
    /// Whether the reported diagnostics should fail the build.
    pub fn fails_build(&self) -> bool {
        self.report.fails_build()
    }

    /// The graph snapshot as pretty-printed JSON.
    pub fn export_json(&self) -> RuntimeResult<String> {
        Ok(self.snapshot.to_json_pretty()?)
    }

    /// The plan, or [`RuntimeError::PlanRejected`] if the build fails.
    pub fn into_result(self) -> RuntimeResult<RegistrationPlan> {
        if self.fails_build() {
            return Err(RuntimeError::PlanRejected {
                errors: self.report.count(ReportLevel::Error),
            });
        }
        Ok(self.plan)
    }
}

/// Gathers candidates from sources and contributors, and plans them.
///
/// The registry is owned by the runtime and only ever grows; each source is
/// merged once under its name.
pub struct PlannerRuntime {
    config: TrellisConfig,
    planner: Planner,
    policy: DiagnosticPolicy,
    sources: Vec<BoxedSource>,
    registry: Mutex<CandidateRegistry>,
}

impl PlannerRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from `config` and initializes logging from it,
    /// unless `logging.enabled` is off.
    pub fn from_config(config: &TrellisConfig) -> ConfigResult<Self> {
        validate_config(config)?;
        logging::init_from_config(&config.logging);

        let policy = DiagnosticPolicy::from_config(&config.diagnostics)?;
        info!(
            log_level = %config.logging.level,
            consuming_assembly = ?config.planner.consuming_assembly,
            strict_plugin_order = config.planner.strict_plugin_order,
            "Planner runtime initialized from configuration"
        );

        Ok(Self {
            config: config.clone(),
            planner: Planner::new(config.planner.to_options()),
            policy,
            sources: Vec::new(),
            registry: Mutex::new(CandidateRegistry::new()),
        })
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    pub fn policy(&self) -> &DiagnosticPolicy {
        &self.policy
    }

    pub fn add_source(&mut self, source: impl CandidateSource + 'static) {
        self.sources.push(Arc::new(source));
    }

    pub fn add_boxed_source(&mut self, source: BoxedSource) {
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: impl CandidateSource + 'static) -> Self {
        self.add_source(source);
        self
    }

    /// Merges `candidates` directly under `contributor`.
    pub fn register(
        &self,
        contributor: &str,
        candidates: Vec<CandidateType>,
    ) -> RuntimeResult<Registration> {
        Ok(self.registry.lock().register(contributor, candidates)?)
    }

    /// Merges every link-time contributor not yet seen.
    pub fn include_linked_contributors(&self) -> RuntimeResult<usize> {
        let merged = self.registry.lock().register_linked()?;
        debug!(merged, "Linked contributors merged");
        Ok(merged)
    }

    /// Number of distinct candidates gathered so far.
    pub fn candidate_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Discovers every source concurrently and merges the results in source
    /// name order.
    ///
    /// Nothing is merged unless every source succeeds and every merge is
    /// conflict-free. Returns the number of sources merged for the first time.
    pub async fn discover(&self) -> RuntimeResult<usize> {
        let results = join_all(self.sources.iter().map(|source| async move {
            (source.name().to_string(), source.discover().await)
        }))
        .await;

        let mut discovered = Vec::with_capacity(results.len());
        for (name, result) in results {
            discovered.push((name, result?));
        }
        discovered.sort_by(|a, b| a.0.cmp(&b.0));

        let mut registry = self.registry.lock();
        let mut staged = registry.clone();
        let mut merged = 0;
        for (name, candidates) in discovered {
            match staged.register(&name, candidates)? {
                Registration::Merged { added, unchanged } => {
                    debug!(source = %name, added, unchanged, "Source merged");
                    merged += 1;
                }
                Registration::AlreadyRegistered => {
                    debug!(source = %name, "Source already merged, skipping");
                }
            }
        }
        *registry = staged;
        Ok(merged)
    }

    /// Discovers all sources, then plans the unified candidate set.
    pub async fn plan(&self) -> RuntimeResult<PlanOutput> {
        self.discover().await?;
        Ok(self.plan_registered())
    }

    /// Plans whatever has been gathered so far, without discovery.
    pub fn plan_registered(&self) -> PlanOutput {
        let candidates = self.registry.lock().snapshot();
        if candidates.is_empty() {
            warn!("Planning an empty candidate set");
        }

        let analysis = self.planner.analyze(&candidates);
        let snapshot = GraphSnapshot::capture(&analysis);
        let report = self.policy.report(analysis.plan.diagnostics());
        report.log();

        info!(
            errors = report.count(ReportLevel::Error),
            warnings = report.count(ReportLevel::Warning),
            suppressed = report.suppressed(),
            fails_build = report.fails_build(),
            "Diagnostics reported"
        );

        PlanOutput {
            plan: analysis.plan,
            snapshot,
            report,
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`PlannerRuntime`] backed by a [`ConfigLoader`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: TrellisConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<PlannerRuntime> {
        let config = self.config_loader.load()?;
        PlannerRuntime::from_config(&config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
