//! Command implementations

pub mod add;
pub mod completions;
pub mod info;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use modforge::core::layout::ModuleLayout;
use modforge::util::config::{load_for_module, Config};
use modforge::util::diagnostic::{emit, Diagnostic};
use modforge::util::Shell;

use crate::cli::ModuleArgs;

/// An error whose diagnostic has already been printed.
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("aborting due to previous error")
    }
}

impl std::error::Error for Reported {}

/// Print `diag` and return the error that ends the command.
pub fn report(shell: &Shell, diag: &Diagnostic) -> anyhow::Error {
    if shell.is_json() {
        shell.error(&diag.message);
    } else {
        emit(diag, shell.use_color());
    }
    anyhow::Error::new(Reported)
}

/// A module opened from the command line.
pub struct OpenModule {
    pub layout: ModuleLayout,
    pub config: Config,
}

impl ModuleArgs {
    /// Module root: `-C <dir>` or the current directory.
    pub fn root(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("failed to get current directory"),
        }
    }

    /// Load config and discover the layout of the selected module.
    pub fn open(&self, shell: &Shell) -> Result<OpenModule> {
        let root = self.root()?;
        let config = load_for_module(&root);
        let layout = ModuleLayout::discover(&root, &config)
            .map_err(|e| report(shell, &Diagnostic::from_error(&e)))?;
        Ok(OpenModule { layout, config })
    }
}
