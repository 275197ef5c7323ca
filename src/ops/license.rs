//! License header selection.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::templates::{LicenseParams, TemplateError, TemplateSet};

/// Inputs of the template fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct LicenseContext<'a> {
    pub templates: &'a TemplateSet,
    pub copyright: &'a str,
    pub year: i32,
}

/// Where the selected license text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum LicenseSource {
    /// The file the request named
    Explicit(PathBuf),
    /// A `LICENSE` or `LICENCE` file in the base directory
    ModuleFile(PathBuf),
    /// The framework's own notice, for in-tree components
    Component,
    /// The default notice naming the copyright holder
    Default,
}

/// A selected license header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    pub text: String,
    pub source: LicenseSource,
}

#[derive(Debug, Error, miette::Diagnostic)]
pub enum LicenseError {
    #[error("failed to read license file `{}`", path.display())]
    #[diagnostic(code(modforge::license::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}

/// Pick the license header for new files.
///
/// First match wins: the explicit file if it exists (relative paths resolve
/// against `base_dir`), `LICENSE`, then `LICENCE` in `base_dir`, the
/// framework notice for components, and finally the default notice.
pub fn select_license(
    base_dir: &Path,
    explicit: Option<&Path>,
    is_component: bool,
    ctx: &LicenseContext<'_>,
) -> Result<License, LicenseError> {
    if let Some(explicit) = explicit {
        let path = base_dir.join(explicit);
        if path.is_file() {
            return read_license(path, LicenseSource::Explicit);
        }
        tracing::warn!(
            "license file `{}` not found, using the module's license",
            path.display()
        );
    }

    for name in ["LICENSE", "LICENCE"] {
        let path = base_dir.join(name);
        if path.is_file() {
            return read_license(path, LicenseSource::ModuleFile);
        }
    }

    let params = LicenseParams {
        copyrightholder: ctx.copyright.to_string(),
        year: ctx.year,
    };
    let (template, source) = if is_component {
        ("grlicense", LicenseSource::Component)
    } else {
        ("defaultlicense", LicenseSource::Default)
    };
    let text = ctx.templates.render(template, &params)?;
    Ok(License { text, source })
}

fn read_license(path: PathBuf, source: fn(PathBuf) -> LicenseSource) -> Result<License, LicenseError> {
    let text = std::fs::read_to_string(&path).map_err(|e| LicenseError::Read {
        path: path.clone(),
        source: e,
    })?;
    tracing::debug!("using license from {}", path.display());
    Ok(License {
        text,
        source: source(path),
    })
}
