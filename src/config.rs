//! Configuration system for the validator
//!
//! Reads configuration from:
//! - `.beanrulerc.yaml` / `.beanrulerc.json` (project-level)
//! - `~/.beanrulerc.yaml` (user-level)

use crate::descriptor::DEFAULT_BEAN_ALIAS;
use crate::expression::condition::ConditionEngine;
use crate::expression::{ExpressionResolver, UNIFIED_EXPRESSION_LANGUAGE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file names, in lookup order
pub const CONFIG_FILE_NAMES: [&str; 3] =
    [".beanrulerc.yaml", ".beanrulerc.yml", ".beanrulerc.json"];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validate batches of beans in parallel
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Expression language settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Language of declarations that do not name one
    pub default_language: String,

    /// Alias of declarations that do not name one
    pub default_bean_alias: String,

    /// Built-in languages to leave unregistered
    pub disabled_languages: Vec<String>,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            default_language: UNIFIED_EXPRESSION_LANGUAGE.to_string(),
            default_bean_alias: DEFAULT_BEAN_ALIAS.to_string(),
            disabled_languages: Vec::new(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Color mode
    pub color: ColorMode,

    /// Debug-level logging, as with `-v`
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Declaration filtering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    /// Declaration ids to skip
    pub disabled: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extend from other configuration files or presets
    pub extends: Vec<String>,

    /// Engine settings
    pub engine: EngineConfig,

    /// Expression language settings
    pub expression: ExpressionConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Declaration filtering
    pub constraints: ConstraintsConfig,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "strict" => Some(Self::preset_strict()),
            _ => None,
        }
    }

    /// Strict preset - only the unified expression language is accepted
    fn preset_strict() -> Self {
        Self {
            expression: ExpressionConfig {
                disabled_languages: vec![ConditionEngine::NAME.to_string()],
                ..ExpressionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent infinite loops)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };
        debug!("Loaded configuration from {}", path.display());

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends {
                let extended = if let Some(preset) = Self::preset(extend) {
                    preset
                } else {
                    let extend_path = if Path::new(extend).is_absolute() {
                        PathBuf::from(extend)
                    } else {
                        base_dir.join(extend)
                    };
                    Self::load_with_depth(&extend_path, depth + 1)?
                };
                base_config.merge(extended);
            }

            // Current file wins over everything it extends
            base_config.merge(config);
            config = base_config;
        }

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        // Extends are not inherited

        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;

        if other.expression.default_language != UNIFIED_EXPRESSION_LANGUAGE {
            self.expression.default_language = other.expression.default_language;
        }
        if other.expression.default_bean_alias != DEFAULT_BEAN_ALIAS {
            self.expression.default_bean_alias = other.expression.default_bean_alias;
        }
        for language in other.expression.disabled_languages {
            if !self.expression.disabled_languages.contains(&language) {
                self.expression.disabled_languages.push(language);
            }
        }

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }

        self.constraints.disabled.extend(other.constraints.disabled);
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::find_in(Path::new(".")) {
            return Self::load(&path);
        }

        if let Some(home) = dirs::home_dir() {
            if let Some(path) = Self::find_in(&home) {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    /// First configuration file present in `dir`
    pub fn find_in(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_constraints: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_constraints {
            self.constraints.disabled.extend(disabled);
        }
    }

    /// Check if a declaration is enabled
    pub fn is_constraint_enabled(&self, id: &str) -> bool {
        !self.constraints.disabled.iter().any(|d| d == id)
    }

    /// Build the language registry this configuration allows
    pub fn build_resolver(&self) -> ExpressionResolver {
        let mut builder = ExpressionResolver::builder().with_builtin();
        for language in &self.expression.disabled_languages {
            if language == &self.expression.default_language {
                warn!("Default expression language '{}' is disabled", language);
            }
            builder = builder.without(language);
        }
        builder.build()
    }
}
