//! Python binding sources for new blocks.
//!
//! A [`BindingGenerator`] turns a [`HeaderInfo`] into the source of one
//! binding file. The aggregator that calls `bind_<block>` is patched by the
//! add operation, not here.

pub mod header;
pub mod pybind;

use thiserror::Error;

pub use header::{ArgumentInfo, ClassInfo, FunctionInfo, HeaderInfo, NamespaceInfo};
pub use pybind::PybindGenerator;

/// Errors raised while generating binding sources.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum BindingError {
    #[error("header of `{module}` describes no class named `{class}`")]
    #[diagnostic(code(modforge::bindings::no_class))]
    NoClass { module: String, class: String },

    #[error("class `{0}` has neither a static `make` nor a constructor")]
    #[diagnostic(code(modforge::bindings::no_factory))]
    NoFactory(String),
}

/// Produces the binding source for one header.
pub trait BindingGenerator {
    /// Render the binding file defining `bind_<base_name>`.
    fn generate(&self, header: &HeaderInfo, base_name: &str) -> Result<String, BindingError>;
}
