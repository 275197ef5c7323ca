//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod scm;
pub mod shell;

pub use config::Config;
pub use diagnostic::Diagnostic;
pub use scm::{detect_scm, GitScm, NoScm, ScmMode, SourceControl};
pub use shell::{ColorChoice, Shell, Status};
