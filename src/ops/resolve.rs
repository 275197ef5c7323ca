//! Decisions derived from a validated block spec and the module layout.
//!
//! Nothing here writes to disk. The only I/O is checking whether files the
//! run would create are already there.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::block::{BlockType, BuildVersion, Language};
use crate::core::layout::{ModuleLayout, Subdir};
use crate::core::request::BlockSpec;

/// Copyright holder used when the request names none.
pub const DEFAULT_COPYRIGHT: &str = "<+YOU OR YOUR COMPANY+>";

/// The module layout cannot host the requested block.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum StructuralError {
    #[error("missing or skipped `{subdir}` subdirectory, required for {language} blocks")]
    #[diagnostic(
        code(modforge::resolve::missing_subdir),
        help("check the module layout, or remove the subdir from the skip list")
    )]
    MissingSubdir { subdir: Subdir, language: Language },

    #[error("block file `{}` already exists", path.display())]
    #[diagnostic(
        code(modforge::resolve::block_exists),
        help("pick another block name, or pass `--force` to overwrite")
    )]
    BlockExists { path: PathBuf },
}

/// Names of the files a run creates, relative to their subdirectory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockFiles {
    /// Public header in the include dir
    pub header: Option<String>,
    /// Library source in lib
    pub source: Option<String>,
    /// Private `_impl` header in lib
    pub impl_header: Option<String>,
    /// Binding source in the bindings dir
    pub bindings: Option<String>,
    /// Python block in the Python package
    pub python: Option<String>,
    /// Python QA script in the Python package
    pub python_qa: Option<String>,
    /// C++ QA source in lib
    pub cpp_qa: Option<String>,
    /// C++ QA header in lib (CppUnit flavor only)
    pub cpp_qa_header: Option<String>,
    /// GRC descriptor in grc
    pub grc: Option<String>,
}

impl BlockFiles {
    /// Absolute paths of every planned file.
    pub fn paths(&self, layout: &ModuleLayout) -> Vec<PathBuf> {
        let entries = [
            (Subdir::Include, &self.header),
            (Subdir::Lib, &self.impl_header),
            (Subdir::Lib, &self.source),
            (Subdir::Bindings, &self.bindings),
            (Subdir::Python, &self.python),
            (Subdir::Lib, &self.cpp_qa),
            (Subdir::Lib, &self.cpp_qa_header),
            (Subdir::Python, &self.python_qa),
            (Subdir::Grc, &self.grc),
        ];
        entries
            .into_iter()
            .filter_map(|(dir, name)| name.as_ref().map(|n| layout.path(dir).join(n)))
            .collect()
    }
}

/// Everything the generation steps need to know, decided up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBlock {
    pub spec: BlockSpec,
    pub modname: String,
    /// `<module>_<block>`
    pub fullname: String,
    pub version: BuildVersion,
    pub is_component: bool,
    pub copyright: String,
    /// License header text, filled in by the license selector
    pub license: String,
    pub add_python_qa: bool,
    pub add_cpp_qa: bool,
    pub skip_cmakefiles: bool,
    pub has_bindings: bool,
    pub has_grc: bool,
    pub files: BlockFiles,
}

impl ResolvedBlock {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn block_type(&self) -> BlockType {
        self.spec.block_type
    }

    pub fn language(&self) -> Language {
        self.spec.language
    }

    pub fn with_license(mut self, license: String) -> Self {
        self.license = license;
        self
    }

    /// C++ QA was requested but the module's build version has no test
    /// harness for it.
    pub fn cpp_qa_unsupported(&self) -> bool {
        self.add_cpp_qa && self.files.cpp_qa.is_none()
    }
}

/// Derive flags and file names for `spec` inside `layout`.
pub fn resolve(spec: BlockSpec, layout: &ModuleLayout) -> Result<ResolvedBlock, StructuralError> {
    let language = spec.language;
    let required = match language {
        Language::Cpp => Subdir::Lib,
        Language::Python => Subdir::Python,
    };
    if layout.is_skipped(required) {
        return Err(StructuralError::MissingSubdir {
            subdir: required,
            language,
        });
    }

    let fullname = format!("{}_{}", layout.name, spec.name);
    let copyright = spec
        .copyright
        .clone()
        .unwrap_or_else(|| DEFAULT_COPYRIGHT.to_string());

    let add_python_qa = spec.add_python_qa
        && spec.block_type != BlockType::Noblock
        && !layout.is_skipped(Subdir::Python);
    let add_cpp_qa = spec.add_cpp_qa && language == Language::Cpp;
    let skip_cmakefiles = spec.skip_cmakefiles || layout.version == BuildVersion::Autofoo;

    let has_bindings = language == Language::Cpp && !layout.is_skipped(Subdir::Bindings);
    let has_grc = !layout.is_skipped(Subdir::Grc)
        && match language {
            Language::Cpp => has_bindings,
            Language::Python => spec.block_type != BlockType::Noblock,
        };

    if skip_cmakefiles && !spec.skip_cmakefiles {
        tracing::debug!("autotools layout: build files will not be edited");
    }

    let files = plan_files(&spec, layout, &fullname, add_python_qa, add_cpp_qa, has_bindings, has_grc);

    let block = ResolvedBlock {
        spec,
        modname: layout.name.clone(),
        fullname,
        version: layout.version,
        is_component: layout.is_component,
        copyright,
        license: String::new(),
        add_python_qa,
        add_cpp_qa,
        skip_cmakefiles,
        has_bindings,
        has_grc,
        files,
    };

    if !block.spec.force {
        if let Some(path) = block.files.paths(layout).into_iter().find(|p| p.exists()) {
            return Err(StructuralError::BlockExists { path });
        }
    }

    Ok(block)
}

fn plan_files(
    spec: &BlockSpec,
    layout: &ModuleLayout,
    fullname: &str,
    add_python_qa: bool,
    add_cpp_qa: bool,
    has_bindings: bool,
    has_grc: bool,
) -> BlockFiles {
    let name = &spec.name;
    let mut files = BlockFiles::default();

    match spec.language {
        Language::Cpp if layout.version.uses_short_names() => {
            files.header = Some(format!("{}.h", name));
            if spec.block_type.has_impl() {
                files.impl_header = Some(format!("{}_impl.h", name));
                files.source = Some(format!("{}_impl.cc", name));
            } else {
                files.source = Some(format!("{}.cc", name));
            }
        }
        Language::Cpp => {
            files.header = Some(format!("{}.h", fullname));
            files.source = Some(format!("{}.cc", fullname));
        }
        Language::Python => {
            files.python = Some(format!("{}.py", name));
        }
    }

    if add_cpp_qa {
        match layout.version {
            BuildVersion::V38 => files.cpp_qa = Some(format!("qa_{}.cc", name)),
            BuildVersion::V37 => {
                files.cpp_qa = Some(format!("qa_{}.cc", name));
                files.cpp_qa_header = Some(format!("qa_{}.h", name));
            }
            BuildVersion::V36 | BuildVersion::Autofoo => {}
        }
    }

    if has_bindings {
        files.bindings = Some(format!("{}_python.cc", name));
    }
    if add_python_qa {
        files.python_qa = Some(format!("qa_{}.py", name));
    }
    if has_grc {
        files.grc = Some(format!("{}.block.yml", fullname));
    }

    files
}
