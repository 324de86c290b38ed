use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::task::{DEFAULT_ID_PREFIX, DEFAULT_ID_WIDTH};
use crate::{Error, Result};

/// File name looked up in the source root before the per-user config.
pub const PROJECT_CONFIG_FILE: &str = "taskgraph.toml";

/// A file-pattern category and the layer it sits on.
///
/// A pattern matches a path when it occurs anywhere in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    pub pattern: String,
    pub layer: u32,
}

impl LayerRule {
    pub fn new(pattern: &str, layer: u32) -> Self {
        Self {
            pattern: pattern.to_string(),
            layer,
        }
    }
}

/// Contender counts at which a file's risk level is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 4,
            high: 3,
            medium: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConfig {
    pub prefix: String,
    pub width: usize,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ID_PREFIX.to_string(),
            width: DEFAULT_ID_WIDTH,
        }
    }
}

/// Which files take part in import analysis and how packages are marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub suffix: String,
    pub package_marker: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            suffix: "py".to_string(),
            package_marker: "__init__.py".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerRule>,
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layers: default_layers(),
            risk: RiskThresholds::default(),
            ids: IdConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// Manifest → database → models → schemas → auth utilities → dependencies
/// → auth router → routers → entry point → tests → README.
pub fn default_layers() -> Vec<LayerRule> {
    vec![
        LayerRule::new("requirements.txt", 0),
        LayerRule::new("database.py", 1),
        LayerRule::new("models.py", 2),
        LayerRule::new("schemas.py", 3),
        LayerRule::new("auth.py", 4),
        LayerRule::new("dependencies.py", 5),
        LayerRule::new("routers/auth.py", 6),
        LayerRule::new("routers/", 7),
        LayerRule::new("main.py", 8),
        LayerRule::new("tests/", 9),
        LayerRule::new("README.md", 10),
    ]
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskgraph"))
    }

    pub fn user_config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    /// Layer of a single file: the highest layer among matching patterns,
    /// 0 when nothing matches.
    pub fn file_layer(&self, file: &str) -> u32 {
        self.layers
            .iter()
            .filter(|rule| file.contains(&rule.pattern))
            .map(|rule| rule.layer)
            .max()
            .unwrap_or(0)
    }

    /// Load `taskgraph.toml` from `root`, falling back to the per-user
    /// config and then to defaults.
    pub fn load_for(root: &Path) -> Result<Self> {
        let project = root.join(PROJECT_CONFIG_FILE);
        if project.is_file() {
            return Self::load_from(&project);
        }
        Self::load()
    }

    /// Load the per-user config, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::user_config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        debug!(
            layers = config.layers.len(),
            critical = config.risk.critical,
            high = config.risk.high,
            medium = config.risk.medium,
            "config loaded"
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        if !(risk.medium >= 2 && risk.medium <= risk.high && risk.high <= risk.critical) {
            return Err(Error::Validation(format!(
                "risk thresholds must satisfy 2 <= medium <= high <= critical, got {}/{}/{}",
                risk.medium, risk.high, risk.critical
            )));
        }
        if self.source.suffix.is_empty() {
            return Err(Error::Validation("source suffix must not be empty".to_string()));
        }
        Ok(())
    }
}
