//! pybind11 binding sources.

use std::fmt::Write;

use super::{ArgumentInfo, BindingError, BindingGenerator, ClassInfo, HeaderInfo};

/// Emits pybind11 sources that register a block class with its base,
/// its `make` factory and `to_basic_block`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PybindGenerator;

impl PybindGenerator {
    pub fn new() -> Self {
        PybindGenerator
    }
}

impl BindingGenerator for PybindGenerator {
    fn generate(&self, header: &HeaderInfo, base_name: &str) -> Result<String, BindingError> {
        let class = header
            .namespace
            .classes
            .iter()
            .find(|c| c.name == base_name)
            .ok_or_else(|| BindingError::NoClass {
                module: header.module_name.clone(),
                class: base_name.to_string(),
            })?;

        let mut out = String::new();
        out.push_str("/* This file is automatically generated using modforge */\n\n");
        out.push_str("#include <pybind11/complex.h>\n");
        out.push_str("#include <pybind11/pybind11.h>\n");
        out.push_str("#include <pybind11/stl.h>\n\n");
        out.push_str("namespace py = pybind11;\n\n");
        writeln!(out, "#include <{}>", header.include).unwrap();
        out.push('\n');

        writeln!(out, "void bind_{}(py::module& m)", base_name).unwrap();
        out.push_str("{\n");
        writeln!(
            out,
            "    using {} = {}::{};\n",
            class.name, header.namespace.name, class.name
        )
        .unwrap();
        write_class(&mut out, class)?;
        out.push_str("}\n");

        Ok(out)
    }
}

fn write_class(out: &mut String, class: &ClassInfo) -> Result<(), BindingError> {
    let name = &class.name;

    if let Some(factory) = class.factory() {
        write!(out, "    py::class_<{}", name).unwrap();
        for base in &class.bases {
            write!(out, ", {}", base).unwrap();
        }
        writeln!(out, ", std::shared_ptr<{}>>(m, \"{}\")\n", name, name).unwrap();
        write!(out, "        .def(py::init(&{}::make)", name).unwrap();
        write_args(out, &factory.arguments);
        out.push_str(")\n");
        if !class.bases.is_empty() {
            writeln!(
                out,
                "        .def(\"to_basic_block\", [](std::shared_ptr<{}> p) {{ return p->to_basic_block(); }})",
                name
            )
            .unwrap();
        }
    } else if let Some(ctor) = class.constructors.first() {
        writeln!(out, "    py::class_<{}>(m, \"{}\")\n", name, name).unwrap();
        let types: Vec<&str> = ctor.arguments.iter().map(|a| a.dtype.as_str()).collect();
        write!(out, "        .def(py::init<{}>()", types.join(", ")).unwrap();
        write_args(out, &ctor.arguments);
        out.push_str(")\n");
    } else {
        return Err(BindingError::NoFactory(name.clone()));
    }

    out.push_str("        ;\n");
    Ok(())
}

fn write_args(out: &mut String, args: &[ArgumentInfo]) {
    for arg in args {
        write!(out, ",\n             py::arg(\"{}\")", arg.name).unwrap();
        if let Some(default) = &arg.default {
            write!(out, " = {}", default).unwrap();
        }
    }
}
