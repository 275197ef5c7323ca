//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use modforge::core::block::{BlockType, Language};
use modforge::util::ColorChoice;

/// modforge - add signal-processing blocks to out-of-tree modules
#[derive(Parser)]
#[command(name = "modforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new block to the module
    Add(AddArgs),

    /// Show the discovered module layout
    Info(InfoArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Block name
    #[arg(required_unless_present = "request")]
    pub name: Option<String>,

    /// Block type
    #[arg(short = 't', long = "block-type", value_parser = block_types())]
    pub block_type: Option<String>,

    /// Programming language
    #[arg(short, long, value_parser = Language::CANDIDATES)]
    pub lang: Option<String>,

    /// Copyright holder for the license header
    #[arg(long)]
    pub copyright: Option<String>,

    /// File whose contents become the license header
    #[arg(long)]
    pub license_file: Option<PathBuf>,

    /// Constructor arguments, e.g. "float gain=1.0, int ntaps"
    #[arg(long, default_value = "")]
    pub argument_list: String,

    /// Add a Python QA test
    #[arg(long)]
    pub add_python_qa: bool,

    /// Add a C++ QA test
    #[arg(long)]
    pub add_cpp_qa: bool,

    /// Leave CMakeLists.txt files untouched
    #[arg(long)]
    pub skip_cmakefiles: bool,

    /// Overwrite files left behind by an earlier run
    #[arg(long)]
    pub force: bool,

    /// Read the request from a TOML file; command-line values win
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    #[command(flatten)]
    pub module: ModuleArgs,

    /// Do not touch the lib directory
    #[arg(long)]
    pub skip_lib: bool,

    /// Do not touch the python directory (or the bindings inside it)
    #[arg(long)]
    pub skip_python: bool,

    /// Do not touch the grc directory
    #[arg(long)]
    pub skip_grc: bool,

    /// Source control integration: auto, none
    #[arg(long)]
    pub scm: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub module: ModuleArgs,

    /// Print the layout as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ModuleArgs {
    /// Module directory (defaults to the current directory)
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}

fn block_types() -> Vec<&'static str> {
    BlockType::ALL.iter().map(|t| t.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::parse_from([
            "modforge",
            "add",
            "lowpass",
            "-t",
            "sync",
            "-l",
            "cpp",
            "--add-cpp-qa",
            "--argument-list",
            "float gain=1.0",
            "-C",
            "gr-howto",
        ]);
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.name.as_deref(), Some("lowpass"));
        assert_eq!(args.block_type.as_deref(), Some("sync"));
        assert_eq!(args.lang.as_deref(), Some("cpp"));
        assert!(args.add_cpp_qa);
        assert!(!args.add_python_qa);
        assert_eq!(args.argument_list, "float gain=1.0");
        assert_eq!(args.module.directory, Some(PathBuf::from("gr-howto")));
    }

    #[test]
    fn test_add_rejects_unknown_block_type() {
        let result = Cli::try_parse_from(["modforge", "add", "x", "-t", "filter"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_language_spellings() {
        for lang in ["cpp", "c++", "python"] {
            assert!(Cli::try_parse_from(["modforge", "add", "x", "-t", "sync", "-l", lang]).is_ok());
        }
        assert!(Cli::try_parse_from(["modforge", "add", "x", "-t", "sync", "-l", "rust"]).is_err());
    }

    #[test]
    fn test_add_needs_name_or_request() {
        assert!(Cli::try_parse_from(["modforge", "add"]).is_err());
        assert!(Cli::try_parse_from(["modforge", "add", "--request", "req.toml"]).is_ok());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["modforge", "-q", "-v", "info"]).is_err());
    }
}
