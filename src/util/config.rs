//! Configuration file support for modforge.
//!
//! modforge reads two configuration file locations:
//! - Global: `~/.modforge/config.toml` - User-wide defaults
//! - Project: `<module>/.modforge/config.toml` - Module-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// modforge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for block requests
    pub defaults: DefaultsConfig,

    /// Module identity overrides
    pub module: ModuleConfig,

    /// Directory convention overrides, relative to the module root
    pub dirs: DirsConfig,

    /// Subdirectories to leave alone
    pub skip: SkipConfig,

    /// Template settings
    pub templates: TemplatesConfig,
}

/// Defaults applied when a request leaves a field empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Copyright holder written into the default license header
    pub copyright: Option<String>,

    /// License file used instead of the default header
    pub license_file: Option<PathBuf>,

    /// Source control integration (auto, none)
    pub scm: Option<String>,
}

/// Module identity, normally discovered from the build files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Module name (e.g. `howto` for `gr-howto`)
    pub name: Option<String>,

    /// Build layout version (36, 37, 38, autofoo)
    pub version: Option<String>,

    /// Whether the module is an in-tree framework component
    pub component: Option<bool>,
}

/// Directory conventions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirsConfig {
    pub lib: Option<PathBuf>,
    pub include: Option<PathBuf>,
    pub python: Option<PathBuf>,
    pub bindings: Option<PathBuf>,
    pub grc: Option<PathBuf>,
}

/// Subdirectories that must not be touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub lib: bool,
    pub include: bool,
    pub python: bool,
    pub bindings: bool,
    pub grc: bool,
}

/// Template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of `*.tera` files overriding the built-in templates
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.defaults.copyright.is_some() {
            self.defaults.copyright = other.defaults.copyright;
        }
        if other.defaults.license_file.is_some() {
            self.defaults.license_file = other.defaults.license_file;
        }
        if other.defaults.scm.is_some() {
            self.defaults.scm = other.defaults.scm;
        }

        if other.module.name.is_some() {
            self.module.name = other.module.name;
        }
        if other.module.version.is_some() {
            self.module.version = other.module.version;
        }
        if other.module.component.is_some() {
            self.module.component = other.module.component;
        }

        if other.dirs.lib.is_some() {
            self.dirs.lib = other.dirs.lib;
        }
        if other.dirs.include.is_some() {
            self.dirs.include = other.dirs.include;
        }
        if other.dirs.python.is_some() {
            self.dirs.python = other.dirs.python;
        }
        if other.dirs.bindings.is_some() {
            self.dirs.bindings = other.dirs.bindings;
        }
        if other.dirs.grc.is_some() {
            self.dirs.grc = other.dirs.grc;
        }

        // Skips only ever accumulate
        self.skip.lib |= other.skip.lib;
        self.skip.include |= other.skip.include;
        self.skip.python |= other.skip.python;
        self.skip.bindings |= other.skip.bindings;
        self.skip.grc |= other.skip.grc;

        if other.templates.dir.is_some() {
            self.templates.dir = other.templates.dir;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (<module>/.modforge/config.toml)
/// 2. Global config (~/.modforge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Load the configuration that applies to the module at `module_root`.
pub fn load_for_module(module_root: &Path) -> Config {
    let global = global_config_path();
    load_config(global.as_deref(), &project_config_path(module_root))
}

/// Get the global modforge config directory (~/.modforge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".modforge"))
}

/// Get the global config path (~/.modforge/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<module>/.modforge/config.toml).
pub fn project_config_path(module_root: &Path) -> PathBuf {
    module_root.join(".modforge").join("config.toml")
}
