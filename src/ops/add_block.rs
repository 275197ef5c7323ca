//! Implementation of `modforge add`.
//!
//! A run walks fixed steps and never goes back: validate the request,
//! resolve every decision, render every new file, then write and patch step
//! by step (code, bindings, tests, GRC descriptor). Validation, layout,
//! template and binding errors abort before anything is written. A patch
//! that cannot be applied is logged, recorded as a warning, and the run
//! carries on.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bindings::{BindingError, BindingGenerator, HeaderInfo, PybindGenerator};
use crate::core::block::{BlockType, BuildVersion, Language};
use crate::core::layout::{ModuleLayout, Subdir};
use crate::core::request::{BlockRequest, ValidationError};
use crate::ops::license::{select_license, LicenseContext, LicenseError, LicenseSource};
use crate::ops::resolve::{resolve, ResolvedBlock, StructuralError};
use crate::patch::cmake::ArgMatch;
use crate::patch::{
    append_to_region, insert_after_marker, Applied, CMakeFile, CommandSelector, InsertAt,
    InsertMode, PatchError, PatchWarning,
};
use crate::templates::{TemplateError, TemplateParams, TemplateSet};
use crate::util::diagnostic::Diagnostic;
use crate::util::fs::{make_executable, relative_path, write_string};
use crate::util::scm::SourceControl;

static PY_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:from\s.*\simport\s|# import any pure)").expect("import pattern is valid")
});

static CPP_INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#include").expect("include pattern is valid"));

static CPPUNIT_SUITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"addTest.*suite|new CppUnit.*TestSuite").expect("suite pattern is valid")
});

const PROTOTYPES_START: &str = "// BINDING_FUNCTION_PROTOTYPES(";
const PROTOTYPES_END: &str = "// ) END BINDING_FUNCTION_PROTOTYPES";
const CALLS_START: &str = "// BINDING_FUNCTION_CALLS(";
const CALLS_END: &str = "// ) END BINDING_FUNCTION_CALLS";

static PYBIND: PybindGenerator = PybindGenerator;

/// Errors that abort a run.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum AddError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    License(#[from] LicenseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bindings(#[from] BindingError),

    #[error("failed to write `{}`", path.display())]
    #[diagnostic(code(modforge::add::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AddError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::from_error(self);
        match self {
            AddError::Write { path, .. }
            | AddError::Structural(StructuralError::BlockExists { path }) => {
                diag.with_location(path.clone())
            }
            _ => diag,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileOperation {
    /// A new file was written.
    Created { path: PathBuf },
    /// An existing file gained `entry`.
    Patched { path: PathBuf, entry: String },
    /// `entry` was already there, possibly through a wildcard.
    AlreadyPresent { path: PathBuf, entry: String },
    /// The edit could not be applied.
    Skipped { path: PathBuf, entry: String, reason: String },
}

/// Outcome of a run. Paths are relative to the module root.
#[derive(Debug, Clone, Serialize)]
pub struct AddReport {
    /// `<module>_<block>`
    pub block: String,
    pub block_type: BlockType,
    pub language: Language,
    pub license: LicenseSource,
    pub operations: Vec<FileOperation>,
    pub warnings: Vec<PatchWarning>,
}

impl AddReport {
    /// Files the run wrote.
    pub fn created(&self) -> impl Iterator<Item = &Path> {
        self.operations.iter().filter_map(|op| match op {
            FileOperation::Created { path } => Some(path.as_path()),
            _ => None,
        })
    }

    /// Existing files the run changed.
    pub fn patched(&self) -> impl Iterator<Item = &Path> {
        self.operations.iter().filter_map(|op| match op {
            FileOperation::Patched { path, .. } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Generation steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Code,
    Bindings,
    Tests,
    Grc,
}

impl Step {
    const ORDER: [Step; 4] = [Step::Code, Step::Bindings, Step::Tests, Step::Grc];
}

/// A rendered file waiting to be written.
#[derive(Debug)]
struct NewFile {
    step: Step,
    path: PathBuf,
    contents: String,
    executable: bool,
}

/// Adds one block to a module.
///
/// ```no_run
/// # use modforge::core::block::BuildVersion;
/// # use modforge::core::layout::ModuleLayout;
/// # use modforge::core::request::BlockRequest;
/// # use modforge::ops::BlockAdder;
/// # use modforge::templates::TemplateSet;
/// let layout = ModuleLayout::new("gr-howto", "howto", BuildVersion::V38);
/// let templates = TemplateSet::builtin();
/// let request = BlockRequest {
///     name: Some("lowpass".into()),
///     block_type: Some("sync".into()),
///     lang: Some("cpp".into()),
///     ..BlockRequest::default()
/// };
/// let report = BlockAdder::new(&layout, &templates).run(&request)?;
/// # Ok::<(), modforge::ops::AddError>(())
/// ```
pub struct BlockAdder<'a> {
    layout: &'a ModuleLayout,
    templates: &'a TemplateSet,
    bindings: &'a dyn BindingGenerator,
    scm: Option<&'a mut dyn SourceControl>,
    base_dir: Option<&'a Path>,
    year: i32,
}

impl<'a> BlockAdder<'a> {
    pub fn new(layout: &'a ModuleLayout, templates: &'a TemplateSet) -> Self {
        BlockAdder {
            layout,
            templates,
            bindings: &PYBIND,
            scm: None,
            base_dir: None,
            year: chrono::Local::now().year(),
        }
    }

    /// Use another binding generator.
    pub fn bindings(mut self, generator: &'a dyn BindingGenerator) -> Self {
        self.bindings = generator;
        self
    }

    /// Record created and edited files with source control.
    pub fn scm(mut self, scm: &'a mut dyn SourceControl) -> Self {
        self.scm = Some(scm);
        self
    }

    /// Directory searched for `LICENSE`/`LICENCE` and against which a
    /// relative license file resolves. Defaults to the module root.
    pub fn base_dir(mut self, dir: &'a Path) -> Self {
        self.base_dir = Some(dir);
        self
    }

    /// Year used in license notices.
    pub fn year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Validate `request` and add the block.
    pub fn run(&mut self, request: &BlockRequest) -> Result<AddReport, AddError> {
        let layout = self.layout;
        let spec = request.validate()?;
        let block = resolve(spec, layout)?;
        debug!(
            "resolved {}: bindings={} grc={} python_qa={} cpp_qa={} skip_cmakefiles={}",
            block.fullname,
            block.has_bindings,
            block.has_grc,
            block.add_python_qa,
            block.add_cpp_qa,
            block.skip_cmakefiles
        );

        let base_dir = self.base_dir.unwrap_or(&layout.root);
        let license = select_license(
            base_dir,
            block.spec.license_file.as_deref(),
            block.is_component,
            &LicenseContext {
                templates: self.templates,
                copyright: &block.copyright,
                year: self.year,
            },
        )?;
        let block = block.with_license(license.text);
        let params = TemplateParams::new(&block, layout, self.year);

        let files = self.render(&block, &params)?;

        info!(
            "adding {} {} block `{}` to module `{}`",
            block.language(),
            block.block_type(),
            block.name(),
            block.modname
        );

        let mut run = Run {
            layout,
            block: &block,
            scm: self
                .scm
                .as_mut()
                .map(|scm| &mut **scm as &mut dyn SourceControl),
            report: AddReport {
                block: block.fullname.clone(),
                block_type: block.block_type(),
                language: block.language(),
                license: license.source,
                operations: Vec::new(),
                warnings: Vec::new(),
            },
        };

        for step in Step::ORDER {
            for file in files.iter().filter(|f| f.step == step) {
                run.create(file)?;
            }
            match step {
                Step::Code => run.edit_code(),
                Step::Bindings => run.edit_bindings(),
                Step::Tests => run.edit_tests(),
                Step::Grc => run.edit_grc(),
            }
        }

        Ok(run.report)
    }

    fn render(&self, block: &ResolvedBlock, params: &TemplateParams) -> Result<Vec<NewFile>, AddError> {
        let planned = &block.files;
        let mut files = Vec::new();

        let (header_template, source_template) = if block.version.uses_short_names() {
            ("block_def_h", "block_impl_cpp")
        } else {
            ("block_h36", "block_cpp36")
        };
        let cpp_qa_template = match block.version {
            BuildVersion::V38 => "qa_cpp_boostutf",
            _ => "qa_cpp",
        };

        let templated = [
            (Step::Code, Subdir::Include, &planned.header, header_template),
            (Step::Code, Subdir::Lib, &planned.impl_header, "block_impl_h"),
            (Step::Code, Subdir::Lib, &planned.source, source_template),
            (Step::Code, Subdir::Python, &planned.python, "block_python"),
            (Step::Tests, Subdir::Lib, &planned.cpp_qa, cpp_qa_template),
            (Step::Tests, Subdir::Lib, &planned.cpp_qa_header, "qa_h"),
            (Step::Tests, Subdir::Python, &planned.python_qa, "qa_python"),
            (Step::Grc, Subdir::Grc, &planned.grc, "grc_yml"),
        ];
        for (step, dir, name, template) in templated {
            let Some(name) = name else { continue };
            files.push(NewFile {
                step,
                path: self.layout.path(dir).join(name),
                contents: self.templates.render(template, params)?,
                executable: name.starts_with("qa_") && name.ends_with(".py"),
            });
        }

        if let Some(name) = &planned.bindings {
            let header = HeaderInfo::for_block(block, &params.include_prefix);
            let source = self.bindings.generate(&header, block.name())?;
            files.push(NewFile {
                step: Step::Bindings,
                path: self.layout.path(Subdir::Bindings).join(name),
                contents: format!("/*\n{}\n */\n\n{}", params.license_c, source),
                executable: false,
            });
        }

        Ok(files)
    }
}

/// State of one run while files are written and patched.
struct Run<'r> {
    layout: &'r ModuleLayout,
    block: &'r ResolvedBlock,
    scm: Option<&'r mut dyn SourceControl>,
    report: AddReport,
}

impl Run<'_> {
    fn create(&mut self, file: &NewFile) -> Result<(), AddError> {
        let write_error = |source| AddError::Write {
            path: file.path.clone(),
            source,
        };
        write_string(&file.path, &file.contents).map_err(write_error)?;
        if file.executable {
            make_executable(&file.path).map_err(write_error)?;
        }

        let rel = self.relative(&file.path);
        info!("adding file `{}`", rel.display());
        self.report.operations.push(FileOperation::Created { path: rel });
        if let Some(scm) = self.scm.as_deref_mut() {
            scm.add_files(std::slice::from_ref(&file.path));
        }
        Ok(())
    }

    fn edit_code(&mut self) {
        let block = self.block;
        let files = self.layout.files();
        let modname = &block.modname;

        if let Some(name) = &block.files.python {
            let import = format!("from .{} import {}", block.name(), block.name());
            let result = insert_after_marker(&files.pyinit, &PY_IMPORT_RE, &import, InsertMode::AfterLast);
            self.record(&files.pyinit, &import, result);

            if !block.skip_cmakefiles {
                self.cmake(&files.cmpython, name, |cm| {
                    cm.append_value(&install_files("GR_PYTHON_INSTALL"), name, &before_destination())
                });
            }
        }

        if block.skip_cmakefiles {
            return;
        }

        if let Some(name) = &block.files.source {
            let sources = CommandSelector::new("list")
                .arg(ArgMatch::exact("APPEND"))
                .arg(ArgMatch::Pattern(list_pattern(&format!(
                    "(?:lib_|gr_|gnuradio_)?{}_sources",
                    regex::escape(modname)
                ))));
            self.cmake(&files.cmlib, name, |cm| {
                match cm.append_value(&sources, name, &InsertAt::End) {
                    Err(PatchError::AnchorNotFound { .. }) => {
                        cm.append_value(&CommandSelector::new("add_library"), name, &InsertAt::End)
                    }
                    other => other,
                }
            });
        }

        if let Some(name) = &block.files.header {
            self.cmake(&files.cminclude, name, |cm| {
                cm.append_value(&install_files("install"), name, &before_destination())
            });
        }
    }

    fn edit_bindings(&mut self) {
        let block = self.block;
        let Some(name) = &block.files.bindings else {
            return;
        };
        let files = self.layout.files();

        let prototype = format!("void bind_{}(py::module& m);", block.name());
        let result = append_to_region(&files.ccpybind, PROTOTYPES_START, PROTOTYPES_END, &prototype);
        self.record(&files.ccpybind, &prototype, result);

        let call = format!("bind_{}(m);", block.name());
        let result = append_to_region(&files.ccpybind, CALLS_START, CALLS_END, &call);
        self.record(&files.ccpybind, &call, result);

        if block.skip_cmakefiles {
            return;
        }
        let modname = regex::escape(&block.modname);
        let python_files = CommandSelector::new("list")
            .arg(ArgMatch::exact("APPEND"))
            .arg(ArgMatch::exact(format!("{}_python_files", block.modname)));
        let pybind_module = CommandSelector::new("pybind11_add_module")
            .arg(ArgMatch::Pattern(list_pattern(&format!("[a-z]*_?{}", modname))));
        let aggregator = InsertAt::Before(ArgMatch::exact("python_bindings.cc"));
        self.cmake(&files.cmpybind, name, |cm| {
            match cm.append_value(&python_files, name, &aggregator) {
                Err(PatchError::AnchorNotFound { .. }) => cm.append_value(&pybind_module, name, &aggregator),
                other => other,
            }
        });
    }

    fn edit_tests(&mut self) {
        let block = self.block;
        let files = self.layout.files();

        if block.cpp_qa_unsupported() {
            let message = match block.version {
                BuildVersion::Autofoo => "C++ QA files are not supported for autotools modules",
                _ => "C++ QA files are not supported for 3.6-style modules",
            };
            warn!("{}", message);
            let path = self.relative(&self.layout.path(Subdir::Lib));
            self.report.warnings.push(PatchWarning {
                path,
                message: message.to_string(),
            });
        }

        if let Some(name) = &block.files.cpp_qa {
            if !block.skip_cmakefiles {
                let tests = CommandSelector::new("list")
                    .arg(ArgMatch::exact("APPEND"))
                    .arg(ArgMatch::exact(format!("test_{}_sources", block.modname)));
                self.cmake(&files.cmlib, name, |cm| cm.append_value(&tests, name, &InsertAt::End));
            }

            if let Some(header) = &block.files.cpp_qa_header {
                let include = format!("#include \"{}\"", header);
                let result = insert_after_marker(&files.qalib, &CPP_INCLUDE_RE, &include, InsertMode::AfterLast);
                self.record(&files.qalib, &include, result);

                let suite = format!("  s->addTest(gr::{}::qa_{}::suite());", block.modname, block.name());
                let result = insert_after_marker(&files.qalib, &CPPUNIT_SUITE_RE, &suite, InsertMode::AfterLast);
                self.record(&files.qalib, suite.trim(), result);
            }
        }

        if let Some(name) = &block.files.python_qa {
            if block.skip_cmakefiles {
                return;
            }
            let test = format!(
                "GR_ADD_TEST(qa_{} ${{PYTHON_EXECUTABLE}} ${{CMAKE_CURRENT_SOURCE_DIR}}/{})",
                block.name(),
                name
            );
            self.cmake(&files.cmpython, &test, |cm| {
                if cm.glob_matches(name) {
                    debug!("`{}` is covered by a file(GLOB) pattern", name);
                    return Ok(Applied::AlreadyPresent);
                }
                cm.append_line(&test)
            });
        }
    }

    fn edit_grc(&mut self) {
        let block = self.block;
        let Some(name) = &block.files.grc else {
            return;
        };
        if block.skip_cmakefiles {
            return;
        }
        let files = self.layout.files();
        self.cmake(&files.cmgrc, name, |cm| {
            if cm.glob_matches(name) {
                debug!("`{}` is covered by a file(GLOB) pattern", name);
                return Ok(Applied::AlreadyPresent);
            }
            cm.append_value(&install_files("install"), name, &before_destination())
        });
    }

    /// Open a CMake file, apply `edit`, and save it if it changed.
    fn cmake(
        &mut self,
        path: &Path,
        entry: &str,
        edit: impl FnOnce(&mut CMakeFile) -> Result<Applied, PatchError>,
    ) {
        let result = CMakeFile::open(path).and_then(|mut cm| {
            let applied = edit(&mut cm)?;
            cm.save()?;
            Ok(applied)
        });
        self.record(path, entry, result);
    }

    fn record(&mut self, path: &Path, entry: &str, result: Result<Applied, PatchError>) {
        let rel = self.relative(path);
        let entry = entry.to_string();
        match result {
            Ok(Applied::Inserted) => {
                info!("editing `{}`: added `{}`", rel.display(), entry);
                self.report.operations.push(FileOperation::Patched { path: rel, entry });
                if let Some(scm) = self.scm.as_deref_mut() {
                    scm.mark_files_updated(&[path.to_path_buf()]);
                }
            }
            Ok(Applied::AlreadyPresent) => {
                debug!("`{}` already lists `{}`", rel.display(), entry);
                self.report
                    .operations
                    .push(FileOperation::AlreadyPresent { path: rel, entry });
            }
            Err(err) => {
                warn!("skipping edit of `{}`: {}", rel.display(), err);
                let reason = err.to_string();
                self.report
                    .warnings
                    .push(PatchWarning::from(&err).relative_to(&self.layout.root));
                self.report.operations.push(FileOperation::Skipped {
                    path: rel,
                    entry,
                    reason,
                });
            }
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        relative_path(&self.layout.root, path)
    }
}

fn install_files(command: &str) -> CommandSelector {
    CommandSelector::new(command).arg(ArgMatch::exact("FILES"))
}

fn before_destination() -> InsertAt {
    InsertAt::Before(ArgMatch::exact("DESTINATION"))
}

fn list_pattern(body: &str) -> Regex {
    Regex::new(&format!("^{}$", body)).expect("list name pattern is valid")
}
