//! Named source templates rendered with tera.
//!
//! The built-in set is compiled into the binary. A module may override any
//! of them by dropping `<name>.tera` files into the directory named by
//! `templates.dir` in its configuration.

pub mod params;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

pub use params::{parse_arguments, LicenseParams, TemplateArg, TemplateParams};

const BUILTIN: [(&str, &str); 13] = [
    ("block_impl_h", include_str!("files/block_impl_h.tera")),
    ("block_impl_cpp", include_str!("files/block_impl_cpp.tera")),
    ("block_def_h", include_str!("files/block_def_h.tera")),
    ("block_h36", include_str!("files/block_h36.tera")),
    ("block_cpp36", include_str!("files/block_cpp36.tera")),
    ("qa_cpp", include_str!("files/qa_cpp.tera")),
    ("qa_h", include_str!("files/qa_h.tera")),
    ("qa_cpp_boostutf", include_str!("files/qa_cpp_boostutf.tera")),
    ("qa_python", include_str!("files/qa_python.tera")),
    ("block_python", include_str!("files/block_python.tera")),
    ("grc_yml", include_str!("files/grc_yml.tera")),
    ("grlicense", include_str!("files/grlicense.tera")),
    ("defaultlicense", include_str!("files/defaultlicense.tera")),
];

/// Errors raised while loading or rendering templates.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum TemplateError {
    #[error("unknown template `{0}`")]
    #[diagnostic(code(modforge::templates::unknown))]
    Unknown(String),

    #[error("failed to render template `{name}`: {message}")]
    #[diagnostic(code(modforge::templates::render))]
    Render { name: String, message: String },

    #[error("failed to load template override `{}`: {message}", path.display())]
    #[diagnostic(
        code(modforge::templates::load),
        help("check the `.tera` files in the configured templates directory")
    )]
    Load { path: PathBuf, message: String },
}

/// The fixed set of templates a run may render.
#[derive(Debug)]
pub struct TemplateSet {
    tera: Tera,
}

impl TemplateSet {
    /// Every template name the set knows.
    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    /// The templates shipped with modforge.
    pub fn builtin() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_templates(BUILTIN.to_vec())
            .expect("built-in templates are valid");
        TemplateSet { tera }
    }

    /// Replace built-ins with the `<name>.tera` files found in `dir`.
    ///
    /// Files whose stem is not a known template name are ignored.
    pub fn with_overrides(mut self, dir: &Path) -> Result<Self, TemplateError> {
        for entry in WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "tera") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !Self::names().any(|name| name == stem) {
                tracing::warn!("ignoring unknown template override `{}`", path.display());
                continue;
            }

            let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Load {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            self.tera
                .add_raw_template(stem, &content)
                .map_err(|e| TemplateError::Load {
                    path: path.to_path_buf(),
                    message: error_chain(&e),
                })?;
            tracing::debug!("template `{}` overridden by {}", stem, path.display());
        }
        Ok(self)
    }

    /// Render template `name` with `params`.
    pub fn render<P: Serialize>(&self, name: &str, params: &P) -> Result<String, TemplateError> {
        if !Self::names().any(|known| known == name) {
            return Err(TemplateError::Unknown(name.to_string()));
        }

        let render_error = |e: tera::Error| TemplateError::Render {
            name: name.to_string(),
            message: error_chain(&e),
        };
        let context = Context::from_serialize(params).map_err(render_error)?;
        self.tera.render(name, &context).map_err(render_error)
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Tera nests the useful message (e.g. the undefined variable) in sources.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BuildVersion;
    use crate::core::layout::ModuleLayout;
    use crate::core::request::BlockRequest;
    use crate::ops::resolve::resolve;
    use tempfile::TempDir;

    fn params(block_type: &str, lang: &str, version: BuildVersion) -> TemplateParams {
        let spec = BlockRequest {
            name: Some("lowpass".into()),
            block_type: Some(block_type.into()),
            lang: Some(lang.into()),
            argument_list: "float gain=1.0".into(),
            ..BlockRequest::default()
        }
        .validate()
        .unwrap();
        let layout = ModuleLayout::new("/tmp/gr-howto", "howto", version);
        let block = resolve(spec, &layout)
            .unwrap()
            .with_license("Copyright 2024 Me.\n\nSPDX-License-Identifier: GPL-3.0-or-later".into());
        TemplateParams::new(&block, &layout, 2024)
    }

    // =========================================================================
    // Built-in Templates
    // =========================================================================

    #[test]
    fn test_every_builtin_renders_for_every_block_type() {
        let templates = TemplateSet::builtin();
        for block_type in crate::core::block::BlockType::ALL {
            let p = params(block_type.as_str(), "cpp", BuildVersion::V38);
            for name in TemplateSet::names() {
                if let Err(e) = templates.render(name, &p) {
                    panic!("{} failed for {}: {}", name, block_type, e);
                }
            }
        }
    }

    #[test]
    fn test_impl_header_for_sync_block() {
        let out = TemplateSet::builtin()
            .render("block_impl_h", &params("sync", "cpp", BuildVersion::V38))
            .unwrap();
        assert!(out.contains("#include <gnuradio/howto/lowpass.h>"));
        assert!(out.contains("class lowpass_impl : public lowpass"));
        assert!(out.contains("lowpass_impl(float gain);"));
        assert!(out.contains("int work(int noutput_items,"));
        assert!(out.contains(" * Copyright 2024 Me.\n *\n * SPDX-License-Identifier"));
    }

    #[test]
    fn test_public_header_declares_make() {
        let out = TemplateSet::builtin()
            .render("block_def_h", &params("decimator", "cpp", BuildVersion::V38))
            .unwrap();
        assert!(out.contains("#ifndef INCLUDED_HOWTO_LOWPASS_H"));
        assert!(out.contains("#include <gnuradio/sync_decimator.h>"));
        assert!(out.contains("class HOWTO_API lowpass : virtual public gr::sync_decimator"));
        assert!(out.contains("typedef std::shared_ptr<lowpass> sptr;"));
        assert!(out.contains("static sptr make(float gain=1.0);"));
    }

    #[test]
    fn test_impl_source_uses_version_specific_factory() {
        let templates = TemplateSet::builtin();
        let modern = templates
            .render("block_impl_cpp", &params("sync", "cpp", BuildVersion::V38))
            .unwrap();
        assert!(modern.contains("gnuradio::make_block_sptr<lowpass_impl>(gain)"));

        let legacy = templates
            .render("block_impl_cpp", &params("sync", "cpp", BuildVersion::V37))
            .unwrap();
        assert!(legacy.contains("gnuradio::get_initial_sptr(new lowpass_impl(gain))"));
    }

    #[test]
    fn test_python_block_signature() {
        let out = TemplateSet::builtin()
            .render("block_python", &params("sync", "python", BuildVersion::V38))
            .unwrap();
        assert!(out.contains("class lowpass(gr.sync_block):"));
        assert!(out.contains("def __init__(self, gain=1.0):"));
        assert!(out.contains("# Copyright 2024 Me.\n#\n# SPDX-License-Identifier"));
    }

    #[test]
    fn test_grc_descriptor() {
        let out = TemplateSet::builtin()
            .render("grc_yml", &params("source", "cpp", BuildVersion::V38))
            .unwrap();
        assert!(out.starts_with("id: howto_lowpass\n"));
        assert!(out.contains("make: howto.lowpass(${gain})"));
        assert!(out.contains("- id: gain\n  label: gain\n  dtype: real\n  default: 1.0"));
        assert!(out.contains("outputs:\n- label: out"));
        assert!(!out.contains("- label: in\n"));
    }

    #[test]
    fn test_default_license() {
        let out = TemplateSet::builtin()
            .render(
                "defaultlicense",
                &LicenseParams {
                    copyrightholder: "Jane Doe".into(),
                    year: 2024,
                },
            )
            .unwrap();
        assert!(out.starts_with("Copyright 2024 Jane Doe.\n"));
    }

    // =========================================================================
    // Errors and Overrides
    // =========================================================================

    #[test]
    fn test_unknown_template() {
        let err = TemplateSet::builtin()
            .render("does_not_exist", &LicenseParams { copyrightholder: String::new(), year: 0 })
            .unwrap_err();
        assert!(matches!(err, TemplateError::Unknown(name) if name == "does_not_exist"));
    }

    #[test]
    fn test_missing_field_is_a_render_error() {
        #[derive(Serialize)]
        struct Empty {}

        let err = TemplateSet::builtin().render("defaultlicense", &Empty {}).unwrap_err();
        assert!(matches!(err, TemplateError::Render { name, .. } if name == "defaultlicense"));
    }

    #[test]
    fn test_override_replaces_builtin() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("defaultlicense.tera"),
            "(c) {{ copyrightholder }}",
        )
        .unwrap();
        std::fs::write(tmp.path().join("unrelated.tera"), "{{ nope }}").unwrap();

        let templates = TemplateSet::builtin().with_overrides(tmp.path()).unwrap();
        let out = templates
            .render(
                "defaultlicense",
                &LicenseParams {
                    copyrightholder: "ACME".into(),
                    year: 2024,
                },
            )
            .unwrap();
        assert_eq!(out, "(c) ACME");
    }

    #[test]
    fn test_broken_override_fails_to_load() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("grc_yml.tera"), "{% if %}").unwrap();

        let err = TemplateSet::builtin().with_overrides(tmp.path()).unwrap_err();
        assert!(matches!(err, TemplateError::Load { .. }));
    }
}
