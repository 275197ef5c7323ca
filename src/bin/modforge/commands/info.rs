//! `modforge info` command

use anyhow::Result;
use modforge::ops::{format_info, module_info};

use crate::cli::InfoArgs;
use crate::GlobalOptions;

pub fn execute(args: InfoArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let module = args.module.open(shell)?;
    let info = module_info(&module.layout);

    if shell.is_json() {
        shell.json_event(&serde_json::to_value(&info)?);
    } else {
        print!("{}", format_info(&info));
    }

    Ok(())
}
