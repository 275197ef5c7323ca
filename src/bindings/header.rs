//! Structural description of a block's public header.

use serde::{Deserialize, Serialize};

use crate::ops::resolve::ResolvedBlock;
use crate::templates::parse_arguments;

/// What the binding generator needs to know about a header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Module name, e.g. `howto`
    pub module_name: String,

    /// Include path of the header, e.g. `gnuradio/howto/lowpass.h`
    pub include: String,

    pub namespace: NamespaceInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Fully qualified, e.g. `gr::howto`
    pub name: String,
    pub classes: Vec<ClassInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,

    /// Qualified base classes, e.g. `gr::sync_block`
    pub bases: Vec<String>,

    pub member_functions: Vec<FunctionInfo>,
    pub constructors: Vec<FunctionInfo>,
}

impl ClassInfo {
    /// The static `make` factory, if the class has one.
    pub fn factory(&self) -> Option<&FunctionInfo> {
        self.member_functions
            .iter()
            .find(|f| f.name == "make" && f.is_static)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub return_type: String,
    pub is_static: bool,
    pub arguments: Vec<ArgumentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentInfo {
    pub name: String,
    pub dtype: String,
    pub default: Option<String>,
}

impl HeaderInfo {
    /// Describe the header generated for `block`.
    ///
    /// `include_prefix` is the include path of the module's public headers,
    /// e.g. `gnuradio/howto`.
    pub fn for_block(block: &ResolvedBlock, include_prefix: &str) -> Self {
        let name = block.name();
        let namespace = format!("gr::{}", block.modname);
        let arguments: Vec<ArgumentInfo> = parse_arguments(&block.spec.argument_list)
            .into_iter()
            .map(|a| ArgumentInfo {
                name: a.name,
                dtype: a.ctype,
                default: a.default,
            })
            .collect();

        let class = match block.block_type().base_class() {
            Some(base) => ClassInfo {
                name: name.to_string(),
                bases: vec![format!("gr::{}", base)],
                member_functions: vec![FunctionInfo {
                    name: "make".into(),
                    return_type: format!("{}::{}::sptr", namespace, name),
                    is_static: true,
                    arguments,
                }],
                constructors: Vec::new(),
            },
            None => ClassInfo {
                name: name.to_string(),
                bases: Vec::new(),
                member_functions: Vec::new(),
                constructors: vec![FunctionInfo {
                    name: name.to_string(),
                    arguments,
                    ..FunctionInfo::default()
                }],
            },
        };

        let include = if include_prefix.is_empty() {
            format!("{}.h", name)
        } else {
            format!("{}/{}.h", include_prefix, name)
        };

        HeaderInfo {
            module_name: block.modname.clone(),
            include,
            namespace: NamespaceInfo {
                name: namespace,
                classes: vec![class],
            },
        }
    }
}
