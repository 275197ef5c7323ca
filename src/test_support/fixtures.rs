//! Test fixtures for common test scenarios.
//!
//! A [`ModuleFixture`] is an out-of-tree module as it looks right after
//! the framework's own module template was instantiated: build files with
//! empty lists and index files with their markers in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::block::BuildVersion;
use crate::core::layout::ModuleLayout;

/// Fixture for a module directory tree.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    /// Module name, without the `gr-` prefix.
    pub name: String,
    pub version: BuildVersion,
    /// Files (path relative to module root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl ModuleFixture {
    /// A module without any files.
    pub fn new(name: impl Into<String>, version: BuildVersion) -> Self {
        ModuleFixture {
            name: name.into(),
            version,
            files: BTreeMap::new(),
        }
    }

    /// A freshly created 3.8 module.
    pub fn v38(name: &str) -> Self {
        ModuleFixture::new(name, BuildVersion::V38)
            .with_file(
                "CMakeLists.txt",
                format!("cmake_minimum_required(VERSION 3.8)\nproject(gr-{name} CXX C)\n"),
            )
            .with_file(
                "lib/CMakeLists.txt",
                format!(
                    "list(APPEND {name}_sources\n)\n\n\
                     add_library(gnuradio-{name} SHARED ${{{name}_sources}})\n\n\
                     list(APPEND test_{name}_sources\n)\n"
                ),
            )
            .with_file(
                format!("include/gnuradio/{name}/CMakeLists.txt"),
                format!("install(FILES\n    api.h\n    DESTINATION include/gnuradio/{name}\n)\n"),
            )
            .with_file(format!("include/gnuradio/{name}/api.h"), "#pragma once\n")
            .with_file(
                format!("python/{name}/CMakeLists.txt"),
                format!(
                    "include(GrPython)\n\n\
                     GR_PYTHON_INSTALL(\n    FILES\n    __init__.py\n    DESTINATION ${{GR_PYTHON_DIR}}/gnuradio/{name}\n)\n\n\
                     include(GrTest)\n"
                ),
            )
            .with_file(
                format!("python/{name}/__init__.py"),
                "# import pybind11 generated symbols into the module namespace\n\
                 try:\n    from .{name}_python import *\nexcept ImportError:\n    pass\n\n\
                 # import any pure python here\n#\n",
            )
            .with_file(
                format!("python/{name}/bindings/CMakeLists.txt"),
                format!("list(APPEND {name}_python_files\n    python_bindings.cc)\n"),
            )
            .with_file(
                format!("python/{name}/bindings/python_bindings.cc"),
                "#include <pybind11/pybind11.h>\n\n\
                 namespace py = pybind11;\n\n\
                 // Headers for binding functions\n\
                 /**************************************/\n\
                 // The following comment block is used for\n\
                 // gr_modtool to insert function prototypes\n\
                 // Please do not delete\n\
                 /**************************************/\n\
                 // BINDING_FUNCTION_PROTOTYPES(\n\
                 // ) END BINDING_FUNCTION_PROTOTYPES\n\n\
                 PYBIND11_MODULE(howto_python, m)\n{\n\
                 \x20   /**************************************/\n\
                 \x20   // BINDING_FUNCTION_CALLS(\n\
                 \x20   // ) END BINDING_FUNCTION_CALLS\n}\n",
            )
            .with_file(
                "grc/CMakeLists.txt",
                "install(FILES\n    DESTINATION share/gnuradio/grc/blocks\n)\n",
            )
    }

    /// A 3.7 module with a CppUnit suite in `lib/qa_<name>.cc`.
    pub fn v37(name: &str) -> Self {
        ModuleFixture::new(name, BuildVersion::V37)
            .with_file("CMakeLists.txt", format!("project(gr-{name} CXX C)\n"))
            .with_file(
                "lib/CMakeLists.txt",
                format!(
                    "list(APPEND {name}_sources\n)\n\n\
                     add_library(gnuradio-{name} SHARED ${{{name}_sources}})\n\n\
                     list(APPEND test_{name}_sources\n    ${{CMAKE_CURRENT_SOURCE_DIR}}/test_{name}.cc\n    ${{CMAKE_CURRENT_SOURCE_DIR}}/qa_{name}.cc\n)\n"
                ),
            )
            .with_file(
                format!("lib/qa_{name}.cc"),
                format!(
                    "#include \"qa_{name}.h\"\n#include <cppunit/TestSuite.h>\n\n\
                     CppUnit::TestSuite *\nqa_{name}::suite()\n{{\n\
                     \x20 CppUnit::TestSuite *s = new CppUnit::TestSuite(\"{name}\");\n\n\
                     \x20 return s;\n}}\n"
                ),
            )
            .with_file(
                format!("include/{name}/CMakeLists.txt"),
                format!("install(FILES\n    api.h\n    DESTINATION include/{name}\n)\n"),
            )
            .with_file(
                "python/CMakeLists.txt",
                format!("GR_PYTHON_INSTALL(\n    FILES\n    __init__.py\n    DESTINATION ${{GR_PYTHON_DIR}}/{name}\n)\n"),
            )
            .with_file("python/__init__.py", format!("from .{name}_swig import *\n"))
            .with_file(
                "grc/CMakeLists.txt",
                format!("install(FILES\n    {name}.tree.yml DESTINATION share/gnuradio/grc/blocks\n)\n"),
            )
    }

    /// Add or replace a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Drop a file.
    pub fn without_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.remove(path.as_ref());
        self
    }

    /// Write the fixture to a directory.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        for (path, content) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }
        Ok(())
    }

    /// Write the fixture into a fresh temporary directory.
    pub fn create(&self) -> (TempDir, ModuleLayout) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path().join(format!("gr-{}", self.name));
        self.write_to(&root).expect("failed to write module fixture");
        let layout = ModuleLayout::new(root, self.name.clone(), self.version);
        (tmp, layout)
    }
}

/// A fresh 3.8 module named `howto`.
pub fn oot_module() -> (TempDir, ModuleLayout) {
    ModuleFixture::v38("howto").create()
}

/// Contents of a file below `root`.
pub fn read(root: &Path, rel: impl AsRef<Path>) -> String {
    let path = root.join(rel);
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("file not found: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::Subdir;
    use crate::util::config::Config;

    #[test]
    fn test_v38_fixture_is_discovered() {
        let (_tmp, layout) = oot_module();
        let discovered = ModuleLayout::discover(&layout.root, &Config::default()).unwrap();
        assert_eq!(discovered, layout);
    }

    #[test]
    fn test_v37_fixture_is_discovered() {
        let (_tmp, layout) = ModuleFixture::v37("howto").create();
        let discovered = ModuleLayout::discover(&layout.root, &Config::default()).unwrap();
        assert_eq!(discovered.version, BuildVersion::V37);
        assert!(discovered.is_skipped(Subdir::Bindings));
    }

    #[test]
    fn test_without_file() {
        let fixture = ModuleFixture::v38("howto").without_file("grc/CMakeLists.txt");
        assert!(!fixture.files.contains_key(Path::new("grc/CMakeLists.txt")));
    }
}
