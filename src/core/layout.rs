//! Out-of-tree module layout.
//!
//! Describes where a module keeps its library sources, public headers,
//! Python package, bindings and GRC descriptors, and which of those
//! subdirectories are active. The add operation only ever reads it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::core::block::BuildVersion;
use crate::util::config::Config;

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*project\s*\(\s*(?:gr-)?([A-Za-z0-9_]+)")
        .expect("project pattern is valid")
});

/// A subdirectory of the module that generation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdir {
    Lib,
    Include,
    Python,
    Bindings,
    Grc,
}

impl Subdir {
    pub const ALL: [Subdir; 5] = [
        Subdir::Lib,
        Subdir::Include,
        Subdir::Python,
        Subdir::Bindings,
        Subdir::Grc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subdir::Lib => "lib",
            Subdir::Include => "include",
            Subdir::Python => "python",
            Subdir::Bindings => "bindings",
            Subdir::Grc => "grc",
        }
    }
}

impl fmt::Display for Subdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subdirectory paths, relative to the module root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDirs {
    pub lib: PathBuf,
    pub include: PathBuf,
    pub python: PathBuf,
    pub bindings: PathBuf,
    pub grc: PathBuf,
}

impl ModuleDirs {
    /// The conventional layout for a module of the given version.
    pub fn conventional(name: &str, version: BuildVersion) -> Self {
        let include = match version {
            BuildVersion::V38 => Path::new("include").join("gnuradio").join(name),
            BuildVersion::V37 => Path::new("include").join(name),
            BuildVersion::V36 | BuildVersion::Autofoo => PathBuf::from("include"),
        };
        let python = match version {
            BuildVersion::V38 => Path::new("python").join(name),
            _ => PathBuf::from("python"),
        };
        ModuleDirs {
            lib: PathBuf::from("lib"),
            include,
            bindings: python.join("bindings"),
            python,
            grc: PathBuf::from("grc"),
        }
    }

    fn get(&self, subdir: Subdir) -> &Path {
        match subdir {
            Subdir::Lib => &self.lib,
            Subdir::Include => &self.include,
            Subdir::Python => &self.python,
            Subdir::Bindings => &self.bindings,
            Subdir::Grc => &self.grc,
        }
    }
}

/// The build and index files generation patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFiles {
    /// `lib/CMakeLists.txt`
    pub cmlib: PathBuf,
    /// `CMakeLists.txt` of the public include dir
    pub cminclude: PathBuf,
    /// `CMakeLists.txt` of the Python package
    pub cmpython: PathBuf,
    /// `__init__.py` of the Python package
    pub pyinit: PathBuf,
    /// `python_bindings.cc` aggregating every `bind_*` call
    pub ccpybind: PathBuf,
    /// `CMakeLists.txt` of the bindings dir
    pub cmpybind: PathBuf,
    /// `grc/CMakeLists.txt`
    pub cmgrc: PathBuf,
    /// `lib/qa_<module>.cc`, the CppUnit suite of 3.7 modules
    pub qalib: PathBuf,
}

/// Where a module keeps things and which parts are active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLayout {
    pub root: PathBuf,
    pub name: String,
    pub version: BuildVersion,
    /// In-tree framework component rather than a third-party module
    pub is_component: bool,
    pub dirs: ModuleDirs,
    skipped: Vec<Subdir>,
}

/// Errors raised while discovering a module layout.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum LayoutError {
    #[error("`{}` does not look like a module: no CMakeLists.txt or configure.ac", .0.display())]
    #[diagnostic(
        code(modforge::layout::not_a_module),
        help("run from the module's top-level directory or pass `-C <dir>`")
    )]
    NotAModule(PathBuf),

    #[error("cannot determine the module name of `{}`", .0.display())]
    #[diagnostic(
        code(modforge::layout::no_name),
        help("set `name` under `[module]` in .modforge/config.toml")
    )]
    NoModuleName(PathBuf),

    #[error("invalid module version `{0}` in configuration")]
    #[diagnostic(code(modforge::layout::bad_version), help("use one of 36, 37, 38, autofoo"))]
    BadVersion(String),
}

impl ModuleLayout {
    /// A layout with conventional directories and every subdir active.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, version: BuildVersion) -> Self {
        let name = name.into();
        ModuleLayout {
            root: root.into(),
            dirs: ModuleDirs::conventional(&name, version),
            name,
            version,
            is_component: false,
            skipped: Vec::new(),
        }
    }

    /// Mark the module as an in-tree framework component.
    pub fn component(mut self, is_component: bool) -> Self {
        self.is_component = is_component;
        self
    }

    /// Replace the directory conventions.
    pub fn with_dirs(mut self, dirs: ModuleDirs) -> Self {
        self.dirs = dirs;
        self
    }

    /// Mark a subdir as skipped.
    pub fn skip(mut self, subdir: Subdir) -> Self {
        if !self.skipped.contains(&subdir) {
            self.skipped.push(subdir);
        }
        self
    }

    /// Inspect the module at `root`, applying `config` overrides.
    ///
    /// Subdirectories that do not exist on disk are marked skipped.
    pub fn discover(root: &Path, config: &Config) -> Result<Self, LayoutError> {
        let cmakelists = root.join("CMakeLists.txt");
        let top_cmake = std::fs::read_to_string(&cmakelists).ok();
        let autotools = root.join("configure.ac").is_file();

        if top_cmake.is_none() && !autotools {
            return Err(LayoutError::NotAModule(root.to_path_buf()));
        }

        let is_component = config.module.component.unwrap_or_else(|| {
            top_cmake
                .as_deref()
                .is_some_and(|text| text.contains("GR_REGISTER_COMPONENT"))
        });

        let name = match &config.module.name {
            Some(name) => name.clone(),
            None => discover_name(root, top_cmake.as_deref(), is_component)
                .ok_or_else(|| LayoutError::NoModuleName(root.to_path_buf()))?,
        };

        let version = match &config.module.version {
            Some(v) => v
                .parse::<BuildVersion>()
                .map_err(|_| LayoutError::BadVersion(v.clone()))?,
            None => discover_version(root, &name, autotools),
        };

        let conventional = ModuleDirs::conventional(&name, version);
        let include = config.dirs.include.clone().unwrap_or_else(|| {
            [
                Path::new("include").join("gnuradio").join(&name),
                Path::new("include").join(&name),
            ]
            .into_iter()
            .find(|p| root.join(p).is_dir())
            .unwrap_or_else(|| PathBuf::from("include"))
        });
        let python = config.dirs.python.clone().unwrap_or_else(|| {
            let nested = Path::new("python").join(&name);
            if root.join(&nested).is_dir() {
                nested
            } else {
                PathBuf::from("python")
            }
        });
        let dirs = ModuleDirs {
            lib: config.dirs.lib.clone().unwrap_or(conventional.lib),
            bindings: config
                .dirs
                .bindings
                .clone()
                .unwrap_or_else(|| python.join("bindings")),
            include,
            python,
            grc: config.dirs.grc.clone().unwrap_or(conventional.grc),
        };

        let mut layout = ModuleLayout {
            root: root.to_path_buf(),
            name,
            version,
            is_component,
            dirs,
            skipped: Vec::new(),
        };

        let configured = [
            (Subdir::Lib, config.skip.lib),
            (Subdir::Include, config.skip.include),
            (Subdir::Python, config.skip.python),
            (Subdir::Bindings, config.skip.bindings),
            (Subdir::Grc, config.skip.grc),
        ];
        for (subdir, skip) in configured {
            if skip || !layout.path(subdir).is_dir() {
                tracing::debug!("skipping subdir `{}`", subdir);
                layout = layout.skip(subdir);
            }
        }

        Ok(layout)
    }

    /// Absolute path of a subdirectory.
    pub fn path(&self, subdir: Subdir) -> PathBuf {
        self.root.join(self.dirs.get(subdir))
    }

    /// Whether a subdirectory is absent or intentionally skipped.
    ///
    /// Bindings live inside the Python package, so skipping Python skips
    /// bindings too.
    pub fn is_skipped(&self, subdir: Subdir) -> bool {
        self.skipped.contains(&subdir)
            || (subdir == Subdir::Bindings && self.skipped.contains(&Subdir::Python))
    }

    /// Subdirectories that will not be touched.
    pub fn skipped(&self) -> Vec<Subdir> {
        Subdir::ALL
            .into_iter()
            .filter(|s| self.is_skipped(*s))
            .collect()
    }

    /// Build and index files inside this layout.
    pub fn files(&self) -> ModuleFiles {
        let lib = self.path(Subdir::Lib);
        let python = self.path(Subdir::Python);
        let bindings = self.path(Subdir::Bindings);
        ModuleFiles {
            cmlib: lib.join("CMakeLists.txt"),
            cminclude: self.path(Subdir::Include).join("CMakeLists.txt"),
            cmpython: python.join("CMakeLists.txt"),
            pyinit: python.join("__init__.py"),
            ccpybind: bindings.join("python_bindings.cc"),
            cmpybind: bindings.join("CMakeLists.txt"),
            cmgrc: self.path(Subdir::Grc).join("CMakeLists.txt"),
            qalib: lib.join(format!("qa_{}.cc", self.name)),
        }
    }
}

fn discover_name(root: &Path, top_cmake: Option<&str>, is_component: bool) -> Option<String> {
    if !is_component {
        if let Some(caps) = top_cmake.and_then(|text| PROJECT_RE.captures(text)) {
            return Some(caps[1].to_string());
        }
    }

    let dir_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))?;
    let name = dir_name.strip_prefix("gr-").unwrap_or(&dir_name);
    (!name.is_empty()).then(|| name.replace('-', "_"))
}

fn discover_version(root: &Path, name: &str, autotools: bool) -> BuildVersion {
    if autotools {
        BuildVersion::Autofoo
    } else if root.join("lib").join(format!("qa_{}.cc", name)).is_file() {
        BuildVersion::V37
    } else if root.join("include").join("gnuradio").join(name).is_dir()
        || root.join("include").join(name).is_dir()
    {
        BuildVersion::V38
    } else {
        BuildVersion::V36
    }
}
