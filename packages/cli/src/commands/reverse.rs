use crate::config::Config;
use anyhow::Result;
use clap::Args;
use mailslot_editor::reverse_markup;
use std::fs;
use std::path::PathBuf;

use super::{emit, parse_failure, resolve};

#[derive(Args, Debug)]
pub struct ReverseArgs {
    /// Editable markup exported from the editor
    pub input: PathBuf,

    /// Write the persisted template here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Editable → persisted, including the image safety net
pub fn reverse(args: ReverseArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = resolve(cwd, &args.input);
    let source = fs::read_to_string(&input)?;

    let persisted =
        reverse_markup(&source, &config.engine).map_err(|err| parse_failure(&source, &input, &err))?;

    emit(args.output.as_deref(), cwd, &persisted)
}
