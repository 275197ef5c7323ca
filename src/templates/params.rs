//! Typed template context.

use serde::Serialize;

use crate::core::block::{BlockType, BuildVersion};
use crate::core::layout::ModuleLayout;
use crate::ops::resolve::ResolvedBlock;

/// One constructor argument parsed from the argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateArg {
    /// C++ type as written, empty for Python-style arguments
    pub ctype: String,
    pub name: String,
    pub default: Option<String>,
    /// GRC parameter dtype derived from `ctype`
    pub dtype: String,
}

/// Everything a template may reference.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateParams {
    pub modname: String,
    pub blockname: String,
    pub fullblockname: String,
    pub blocktype: String,
    /// Framework base class, empty for noblock
    pub grblocktype: String,
    /// Python base class used by Python blocks
    pub py_base: String,
    pub lang: String,
    pub version: String,
    pub is_component: bool,
    pub copyrightholder: String,
    pub year: i32,

    pub license: String,
    /// License as a C block comment body (` * ` prefixed)
    pub license_c: String,
    /// License as `# ` prefixed lines
    pub license_py: String,

    /// Argument list as given
    pub arglist: String,
    pub args: Vec<TemplateArg>,
    /// `float gain=1.0, int ntaps`
    pub arglist_decl: String,
    /// `float gain, int ntaps`
    pub arglist_def: String,
    /// `gain, ntaps`
    pub arg_names: String,
    /// `, gain=1.0, ntaps` for Python signatures
    pub py_params: String,
    /// `${gain}, ${ntaps}` for GRC make templates
    pub grc_make_args: String,

    pub has_input: bool,
    pub has_output: bool,

    /// Include path prefix of public headers, e.g. `gnuradio/howto`
    pub include_prefix: String,
    pub include_guard: String,
    pub impl_include_guard: String,
    /// `HOWTO_API`
    pub api_macro: String,
    pub sptr_type: String,
}

/// Values the license templates reference.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseParams {
    pub copyrightholder: String,
    pub year: i32,
}

impl TemplateParams {
    /// Build the context for `block`.
    ///
    /// `block.license` must already be selected.
    pub fn new(block: &ResolvedBlock, layout: &ModuleLayout, year: i32) -> Self {
        let block_type = block.block_type();
        let args = parse_arguments(&block.spec.argument_list);
        let modname = block.modname.clone();
        let blockname = block.name().to_string();

        let include_prefix = layout
            .dirs
            .include
            .strip_prefix("include")
            .unwrap_or(layout.dirs.include.as_path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let guard_stem = match layout.version {
            BuildVersion::V38 | BuildVersion::V37 => format!("{}_{}", modname, blockname),
            BuildVersion::V36 | BuildVersion::Autofoo => block.fullname.clone(),
        }
        .to_uppercase();

        TemplateParams {
            fullblockname: block.fullname.clone(),
            blocktype: block_type.as_str().to_string(),
            grblocktype: block_type.base_class().unwrap_or_default().to_string(),
            py_base: python_base(block_type).to_string(),
            lang: block.language().as_str().to_string(),
            version: block.version.as_str().to_string(),
            is_component: block.is_component,
            copyrightholder: block.copyright.clone(),
            year,
            license_c: comment_lines(&block.license, " *"),
            license_py: comment_lines(&block.license, "#"),
            license: block.license.clone(),
            arglist: block.spec.argument_list.clone(),
            arglist_decl: join_args(&args, |a| match &a.default {
                Some(d) => format!("{}={}", declaration(a), d),
                None => declaration(a),
            }),
            arglist_def: join_args(&args, declaration),
            arg_names: join_args(&args, |a| a.name.clone()),
            py_params: args
                .iter()
                .map(|a| match &a.default {
                    Some(d) => format!(", {}={}", a.name, d),
                    None => format!(", {}", a.name),
                })
                .collect(),
            grc_make_args: join_args(&args, |a| format!("${{{}}}", a.name)),
            args,
            has_input: block_type.has_input(),
            has_output: block_type.has_output(),
            include_guard: format!("INCLUDED_{}_H", guard_stem),
            impl_include_guard: format!("INCLUDED_{}_IMPL_H", guard_stem),
            api_macro: format!("{}_API", modname.to_uppercase()),
            sptr_type: match layout.version {
                BuildVersion::V38 => "std::shared_ptr",
                _ => "boost::shared_ptr",
            }
            .to_string(),
            include_prefix,
            modname,
            blockname,
        }
    }
}

fn python_base(block_type: BlockType) -> &'static str {
    match block_type {
        BlockType::Sink | BlockType::Source | BlockType::Sync => "gr.sync_block",
        BlockType::Decimator => "gr.decim_block",
        BlockType::Interpolator => "gr.interp_block",
        BlockType::General | BlockType::TaggedStream => "gr.basic_block",
        BlockType::Hier => "gr.hier_block2",
        BlockType::Noblock => "",
    }
}

fn declaration(arg: &TemplateArg) -> String {
    if arg.ctype.is_empty() {
        arg.name.clone()
    } else {
        format!("{} {}", arg.ctype, arg.name)
    }
}

fn join_args(args: &[TemplateArg], f: impl Fn(&TemplateArg) -> String) -> String {
    args.iter().map(f).collect::<Vec<_>>().join(", ")
}

/// Prefix every line of `text` with `prefix`, keeping blank lines bare.
fn comment_lines(text: &str, prefix: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                prefix.to_string()
            } else {
                format!("{} {}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse `float gain=1.0, std::vector<int> taps` into arguments.
///
/// Commas nested in `<>`, `()`, `[]` or `{}` do not split.
pub fn parse_arguments(list: &str) -> Vec<TemplateArg> {
    split_top_level(list)
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| {
            let (decl, default) = match piece.split_once('=') {
                Some((d, v)) => (d.trim(), Some(v.trim().to_string())),
                None => (piece.trim(), None),
            };
            let split = decl
                .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .map_or(0, |i| i + 1);
            let ctype = decl[..split].trim().to_string();
            TemplateArg {
                name: decl[split..].to_string(),
                dtype: grc_dtype(&ctype).to_string(),
                ctype,
                default,
            }
        })
        .collect()
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    // Past a top-level `=`, `<` and `>` are operators rather than template brackets.
    let mut in_default = false;
    let mut chars = list.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                while let Some((_, next)) = chars.next() {
                    match next {
                        '\\' => {
                            chars.next();
                        }
                        q if q == c => break,
                        _ => {}
                    }
                }
            }
            '<' if !in_default => depth += 1,
            '>' if !in_default => depth = (depth - 1).max(0),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = (depth - 1).max(0),
            '=' if depth == 0 => in_default = true,
            ',' if depth == 0 => {
                pieces.push(&list[start..i]);
                start = i + 1;
                in_default = false;
            }
            _ => {}
        }
    }
    pieces.push(&list[start..]);
    pieces
}

/// GRC dtype for a C++ parameter type.
pub fn grc_dtype(ctype: &str) -> &'static str {
    let bare = ctype
        .trim_start_matches("const ")
        .trim_end_matches(['&', '*', ' '])
        .trim();
    match bare {
        "float" | "double" => "real",
        "int" | "short" | "long" | "unsigned" | "unsigned int" | "size_t" | "int32_t"
        | "uint32_t" | "int64_t" | "uint64_t" => "int",
        "gr_complex" | "std::complex<float>" | "gr_complexd" | "std::complex<double>" => "complex",
        "bool" => "bool",
        "std::string" => "string",
        "std::vector<float>" | "std::vector<double>" => "real_vector",
        "std::vector<int>" => "int_vector",
        "std::vector<gr_complex>" | "std::vector<std::complex<float>>" => "complex_vector",
        _ => "raw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::BlockRequest;
    use crate::ops::resolve::resolve;

    #[test]
    fn test_parse_cpp_arguments() {
        let args = parse_arguments("float gain=1.0, int ntaps, std::vector<float> taps");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].ctype, "float");
        assert_eq!(args[0].name, "gain");
        assert_eq!(args[0].default.as_deref(), Some("1.0"));
        assert_eq!(args[0].dtype, "real");
        assert_eq!(args[1].dtype, "int");
        assert_eq!(args[1].default, None);
        assert_eq!(args[2].ctype, "std::vector<float>");
        assert_eq!(args[2].dtype, "real_vector");
    }

    #[test]
    fn test_nested_commas_do_not_split() {
        let args = parse_arguments("std::map<int, float> table, const std::string& label=\"a\"");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].ctype, "std::map<int, float>");
        assert_eq!(args[1].ctype, "const std::string&");
        assert_eq!(args[1].name, "label");
        assert_eq!(args[1].dtype, "string");
    }

    #[test]
    fn test_quoted_default_keeps_commas() {
        let args = parse_arguments("const std::string& label=\"a,b\", int n");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].ctype, "const std::string&");
        assert_eq!(args[0].name, "label");
        assert_eq!(args[0].default.as_deref(), Some("\"a,b\""));
        assert_eq!(args[1].ctype, "int");
        assert_eq!(args[1].name, "n");
    }

    #[test]
    fn test_escaped_quote_and_char_defaults() {
        let args = parse_arguments("std::string s=\"x\\\",y\", char sep=',', int n");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].default.as_deref(), Some("\"x\\\",y\""));
        assert_eq!(args[1].default.as_deref(), Some("','"));
        assert_eq!(args[2].name, "n");
    }

    #[test]
    fn test_comparison_in_default_does_not_nest() {
        let args = parse_arguments("int n=(2>1), float gain=1.0");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].default.as_deref(), Some("(2>1)"));
        assert_eq!(args[1].name, "gain");

        let args = parse_arguments("bool big=a>b, int k");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].name, "k");
    }

    #[test]
    fn test_parse_python_arguments() {
        let args = parse_arguments("gain=1.0, ntaps");
        assert_eq!(args[0].ctype, "");
        assert_eq!(args[0].name, "gain");
        assert_eq!(args[0].dtype, "raw");
        assert_eq!(args[1].name, "ntaps");
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_arguments("").is_empty());
        assert!(parse_arguments("  ").is_empty());
    }

    #[test]
    fn test_comment_lines() {
        let text = "Copyright 2024 Me.\n\nSPDX-License-Identifier: GPL-3.0-or-later\n";
        assert_eq!(
            comment_lines(text, " *"),
            " * Copyright 2024 Me.\n *\n * SPDX-License-Identifier: GPL-3.0-or-later"
        );
        assert_eq!(
            comment_lines(text, "#"),
            "# Copyright 2024 Me.\n#\n# SPDX-License-Identifier: GPL-3.0-or-later"
        );
    }

    #[test]
    fn test_params_for_modern_cpp_block() {
        let spec = BlockRequest {
            name: Some("lowpass".into()),
            block_type: Some("decimator".into()),
            lang: Some("cpp".into()),
            argument_list: "float cutoff=0.25, int ntaps".into(),
            ..BlockRequest::default()
        }
        .validate()
        .unwrap();
        let layout = ModuleLayout::new("/tmp/gr-howto", "howto", BuildVersion::V38);
        let block = resolve(spec, &layout)
            .unwrap()
            .with_license("Copyright 2024 Me.".into());

        let params = TemplateParams::new(&block, &layout, 2024);
        assert_eq!(params.fullblockname, "howto_lowpass");
        assert_eq!(params.grblocktype, "sync_decimator");
        assert_eq!(params.py_base, "gr.decim_block");
        assert_eq!(params.include_prefix, "gnuradio/howto");
        assert_eq!(params.include_guard, "INCLUDED_HOWTO_LOWPASS_H");
        assert_eq!(params.api_macro, "HOWTO_API");
        assert_eq!(params.sptr_type, "std::shared_ptr");
        assert_eq!(params.arglist_decl, "float cutoff=0.25, int ntaps");
        assert_eq!(params.arglist_def, "float cutoff, int ntaps");
        assert_eq!(params.arg_names, "cutoff, ntaps");
        assert_eq!(params.grc_make_args, "${cutoff}, ${ntaps}");
        assert_eq!(params.license_c, " * Copyright 2024 Me.");
        assert!(params.has_input && params.has_output);
    }

    #[test]
    fn test_params_for_old_layout() {
        let spec = BlockRequest {
            name: Some("lowpass".into()),
            block_type: Some("sink".into()),
            lang: Some("cpp".into()),
            ..BlockRequest::default()
        }
        .validate()
        .unwrap();
        let layout = ModuleLayout::new("/tmp/gr-howto", "howto", BuildVersion::V36);
        let block = resolve(spec, &layout).unwrap();

        let params = TemplateParams::new(&block, &layout, 2024);
        assert_eq!(params.include_prefix, "");
        assert_eq!(params.sptr_type, "boost::shared_ptr");
        assert!(!params.has_output);
    }
}
