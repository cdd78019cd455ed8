use crate::config::Config;
use anyhow::Result;
use clap::Args;
use mailslot_editor::{DocumentSession, EditorError};
use std::fs;
use std::path::PathBuf;

use super::{emit, parse_failure, resolve, template_id};

#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// Persisted template to open
    pub input: PathBuf,

    /// Write the editable markup here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Persisted → editable, as the visual editor would load it
pub fn forward(args: ForwardArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = resolve(cwd, &args.input);
    let source = fs::read_to_string(&input)?;

    let session = match DocumentSession::from_markup(&template_id(&input), &source, config.engine) {
        Ok(session) => session,
        Err(EditorError::Parse(err)) => return Err(parse_failure(&source, &input, &err)),
        Err(err) => return Err(err.into()),
    };

    emit(args.output.as_deref(), cwd, &session.editable_markup())
}
