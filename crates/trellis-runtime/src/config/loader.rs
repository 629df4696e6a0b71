//! Layered configuration loading on `figment`.
//!
//! A load resolves to an ordered list of [`ConfigLayer`]s, lowest priority
//! first:
//!
//! ```text
//! defaults → trellis.toml → trellis.<profile>.toml → TRELLIS_* → merge(..)
//! ```
//!
//! Files are looked up in the first search directory that holds any of
//! them (by default the working directory, then the user config directory).
//! `trellis.yaml` / `trellis.yml` join the lookup with the `yaml-config`
//! feature; `toml-config` is on by default.
//!
//! Environment variables nest with `__`:
//! `TRELLIS_DIAGNOSTICS__OVERRIDES__LIFETIME_MISMATCH=error`.
//! `TRELLIS_PROFILE` picks the profile when none is set in code.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::TrellisConfig;
use super::validation::validate_config;

/// Environment variable naming the active profile.
pub const PROFILE_ENV: &str = "TRELLIS_PROFILE";

const ENV_PREFIX: &str = "TRELLIS_";
const FILE_STEM: &str = "trellis";

// ─── File formats ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Formats compiled in, in lookup order.
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

// ─── Layers ───────────────────────────────────────────────────────────────────

/// One source of configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLayer {
    Defaults,
    File(PathBuf),
    Environment,
    Overrides(Box<TrellisConfig>),
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => f.write_str("defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "{ENV_PREFIX}*"),
            Self::Overrides(_) => f.write_str("overrides"),
        }
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Resolves and merges configuration layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
    overrides: Vec<TrellisConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader reading files, the environment and [`PROFILE_ENV`].
    pub fn new() -> Self {
        Self {
            profile: std::env::var(PROFILE_ENV)
                .ok()
                .filter(|name| !name.trim().is_empty()),
            search_paths: Vec::new(),
            file: None,
            env: true,
            overrides: Vec::new(),
        }
    }

    /// Also reads `trellis.<profile>.*`, over the base file.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Some(profile.as_ref().to_string());
        self
    }

    /// Searches `path` for configuration files. Replaces the default
    /// directories once called.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Reads exactly `path`, skipping the search and any profile file.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers `config` over everything else; later merges win.
    pub fn merge(mut self, config: TrellisConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// The layers a [`load`](Self::load) would merge, lowest priority first.
    pub fn layers(&self) -> ConfigResult<Vec<ConfigLayer>> {
        let mut layers = vec![ConfigLayer::Defaults];
        layers.extend(self.files()?.into_iter().map(ConfigLayer::File));
        if self.env {
            layers.push(ConfigLayer::Environment);
        }
        layers.extend(
            self.overrides
                .iter()
                .cloned()
                .map(|config| ConfigLayer::Overrides(Box::new(config))),
        );
        Ok(layers)
    }

    /// Merges every layer, then validates the result.
    pub fn load(self) -> ConfigResult<TrellisConfig> {
        let layers = self.layers()?;
        let mut figment = Figment::new();
        for layer in &layers {
            figment = merge_layer(figment, layer)?;
        }

        let config: TrellisConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(format!("Failed to extract configuration: {e}")))?;
        validate_config(&config)?;

        let sources: Vec<String> = layers.iter().map(ToString::to_string).collect();
        info!(
            profile = self.profile.as_deref().unwrap_or("none"),
            ?sources,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn files(&self) -> ConfigResult<Vec<PathBuf>> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            if FileFormat::of(path).is_none() {
                return Err(unsupported(path));
            }
            return Ok(vec![path.clone()]);
        }

        for dir in self.search_dirs() {
            let found: Vec<PathBuf> = self
                .file_names()
                .into_iter()
                .map(|name| dir.join(name))
                .filter(|path| path.is_file())
                .collect();
            if !found.is_empty() {
                return Ok(found);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(Vec::new())
    }

    /// Candidate names within one directory, lowest priority first.
    fn file_names(&self) -> Vec<String> {
        let extensions = FileFormat::ENABLED
            .iter()
            .flat_map(|format| format.extensions().iter().copied());
        let mut names: Vec<String> = extensions
            .clone()
            .map(|ext| format!("{FILE_STEM}.{ext}"))
            .collect();
        if let Some(profile) = &self.profile {
            names.extend(extensions.map(|ext| format!("{FILE_STEM}.{profile}.{ext}")));
        }
        names
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
            .collect()
    }
}

fn merge_layer(figment: Figment, layer: &ConfigLayer) -> ConfigResult<Figment> {
    let merged = match layer {
        ConfigLayer::Defaults => figment.merge(Serialized::defaults(TrellisConfig::default())),
        ConfigLayer::File(path) => {
            let format = FileFormat::of(path).ok_or_else(|| unsupported(path))?;
            format.merge_into(figment, path)
        }
        ConfigLayer::Environment => figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["profile"])
                .split("__"),
        ),
        ConfigLayer::Overrides(config) => figment.merge(Serialized::defaults(config.as_ref())),
    };
    Ok(merged)
}

fn unsupported(path: &Path) -> ConfigError {
    ConfigError::ParseError(format!(
        "Unsupported or disabled configuration file format: {}",
        path.display()
    ))
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<TrellisConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<TrellisConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::schema::{LogLevel, ReportLevel};

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|jail| {
            let loader = ConfigLoader::new().search_path(jail.directory()).without_env();
            assert_eq!(loader.layers().map_err(|e| e.to_string())?, vec![ConfigLayer::Defaults]);

            let config = loader.load().map_err(|e| e.to_string())?;
            assert_eq!(config, TrellisConfig::default());
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "trellis.toml",
                r#"
                [logging]
                level = "debug"

                [planner]
                consuming_assembly = "Shop"

                [diagnostics.overrides]
                lifetime_mismatch = "error"
                "#,
            )?;
            jail.set_env("TRELLIS_PLANNER__STRICT_PLUGIN_ORDER", "true");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.planner.consuming_assembly.as_deref(), Some("Shop"));
            assert!(config.planner.strict_plugin_order);
            assert_eq!(
                config.diagnostics.overrides.get("lifetime_mismatch"),
                Some(&ReportLevel::Error)
            );
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_overrides_base() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "trellis.ci.toml",
                "[planner]\nstrict_plugin_order = true\n[logging]\nlevel = \"trace\"",
            )?;
            jail.create_file("trellis.toml", "[logging]\nlevel = \"warn\"\nthread_ids = true")?;

            let config = ConfigLoader::new()
                .profile("ci")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Trace);
            assert!(config.logging.thread_ids);
            assert!(config.planner.strict_plugin_order);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_from_env_selects_file() {
        Jail::expect_with(|jail| {
            jail.create_file("trellis.nightly.toml", "[logging]\nenabled = false")?;
            jail.set_env(PROFILE_ENV, "nightly");

            let loader = ConfigLoader::new().search_path(jail.directory());
            let layers = loader.layers().map_err(|e| e.to_string())?;
            assert_eq!(
                layers[1],
                ConfigLayer::File(jail.directory().join("trellis.nightly.toml"))
            );

            let config = loader.load().map_err(|e| e.to_string())?;
            assert!(!config.logging.enabled);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_first_directory_with_files_wins() {
        Jail::expect_with(|jail| {
            jail.create_dir("empty")?;
            jail.create_dir("project")?;
            jail.create_dir("home")?;
            jail.create_file("project/trellis.toml", "[logging]\nlevel = \"debug\"")?;
            jail.create_file("home/trellis.toml", "[logging]\nlevel = \"error\"")?;

            let config = ConfigLoader::new()
                .search_path(jail.directory().join("empty"))
                .search_path(jail.directory().join("project"))
                .search_path(jail.directory().join("home"))
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/trellis.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("trellis.ini", "level = debug")?;
            let result = ConfigLoader::new()
                .file(jail.directory().join("trellis.ini"))
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_override_fails_load() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "trellis.toml",
                "[diagnostics.overrides]\ncircular_dependency = \"suppressed\"",
            )?;
            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_merge_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("TRELLIS_LOGGING__LEVEL", "error");
            let mut overrides = TrellisConfig::default();
            overrides.logging.level = LogLevel::Trace;

            let loader = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(overrides);
            let layers = loader.layers().map_err(|e| e.to_string())?;
            assert_eq!(layers.len(), 3);
            assert_eq!(layers[1], ConfigLayer::Environment);

            let config = loader.load().map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Trace);
            Ok(())
        });
    }
}
