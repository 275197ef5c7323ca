//! `modforge add` command

use anyhow::{Context, Result};
use modforge::core::layout::Subdir;
use modforge::core::request::BlockRequest;
use modforge::ops::{AddReport, BlockAdder, FileOperation};
use modforge::templates::TemplateSet;
use modforge::util::diagnostic::{emit, suggestions, Diagnostic};
use modforge::util::{detect_scm, ScmMode, Status};

use super::report;
use crate::cli::AddArgs;
use crate::GlobalOptions;

pub fn execute(args: AddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let module = args.module.open(shell)?;
    let config = &module.config;
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let mut request = match &args.request {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read request file: {}", path.display()))?;
            toml::from_str::<BlockRequest>(&text)
                .with_context(|| format!("failed to parse request file: {}", path.display()))?
        }
        None => BlockRequest::default(),
    };

    // Command-line values win over the request file
    if args.name.is_some() {
        request.name = args.name;
    }
    if args.block_type.is_some() {
        request.block_type = args.block_type;
    }
    if args.lang.is_some() {
        request.lang = args.lang;
    }
    if args.copyright.is_some() {
        request.copyright = args.copyright;
    }
    if let Some(file) = args.license_file {
        request.license_file = Some(cwd.join(file));
    }
    if !args.argument_list.is_empty() {
        request.argument_list = args.argument_list;
    }
    if args.add_python_qa {
        request.add_python_qa = toml::Value::Boolean(true);
    }
    if args.add_cpp_qa {
        request.add_cpp_qa = toml::Value::Boolean(true);
    }
    if args.skip_cmakefiles {
        request.skip_cmakefiles = toml::Value::Boolean(true);
    }
    request.force |= args.force;

    // Then the configured defaults
    if request.copyright.is_none() {
        request.copyright = config.defaults.copyright.clone();
    }
    if request.license_file.is_none() {
        request.license_file = config.defaults.license_file.clone();
    }

    let mut layout = module.layout;
    for (skip, subdir) in [
        (args.skip_lib, Subdir::Lib),
        (args.skip_python, Subdir::Python),
        (args.skip_grc, Subdir::Grc),
    ] {
        if skip {
            layout = layout.skip(subdir);
        }
    }

    let mut templates = TemplateSet::builtin();
    if let Some(dir) = &config.templates.dir {
        templates = templates
            .with_overrides(&layout.root.join(dir))
            .map_err(|e| report(shell, &Diagnostic::from_error(&e)))?;
    }

    let scm_mode = match args.scm.as_deref().or(config.defaults.scm.as_deref()) {
        Some(mode) => mode.parse::<ScmMode>().map_err(anyhow::Error::msg)?,
        None => ScmMode::default(),
    };
    let mut scm = detect_scm(&layout.root, scm_mode);

    let result = BlockAdder::new(&layout, &templates)
        .scm(scm.as_mut())
        .run(&request);
    let add_report = result.map_err(|e| report(shell, &e.to_diagnostic()))?;

    if shell.is_json() {
        shell.json_event(&serde_json::to_value(&add_report)?);
    } else {
        print_summary(&add_report, shell);
    }

    Ok(())
}

fn print_summary(add_report: &AddReport, shell: &modforge::util::Shell) {
    if shell.is_verbose() {
        for op in &add_report.operations {
            if let FileOperation::AlreadyPresent { path, entry } = op {
                shell.status(Status::Unchanged, format!("{} already lists {}", path.display(), entry));
            }
        }
    }

    if !shell.is_quiet() {
        for warning in &add_report.warnings {
            let skipped = add_report.operations.iter().any(
                |op| matches!(op, FileOperation::Skipped { path, .. } if *path == warning.path),
            );
            let mut diag = warning.to_diagnostic();
            if skipped {
                diag = diag.with_suggestion(suggestions::PATCH_SKIPPED);
            }
            emit(&diag, shell.use_color());
        }
    }

    let created = add_report.created().count();
    let patched = add_report.patched().count();
    let warnings = add_report.warnings.len();
    shell.status(
        Status::Finished,
        format!(
            "{} {} block `{}`: {} file{} created, {} edit{}, {} warning{}",
            add_report.language,
            add_report.block_type,
            add_report.block,
            created,
            plural(created),
            patched,
            plural(patched),
            warnings,
            plural(warnings)
        ),
    );
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
