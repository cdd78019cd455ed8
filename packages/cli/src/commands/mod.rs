pub mod blank;
pub mod forward;
pub mod lint;
pub mod reverse;

pub use blank::{blank, BlankArgs};
pub use forward::{forward, ForwardArgs};
pub use lint::{lint, LintArgs};
pub use reverse::{reverse, ReverseArgs};

use std::path::{Path, PathBuf};

/// Resolve a user-given path against the working directory
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    PathBuf::from(cwd).join(path)
}

/// Print to stdout, or write the file and report it
pub(crate) fn emit(output: Option<&Path>, cwd: &str, content: &str) -> anyhow::Result<()> {
    use colored::Colorize;

    match output {
        Some(path) => {
            let path = resolve(cwd, path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
            eprintln!("  {} {}", "✓".green(), path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Print an ariadne report for a parse failure and turn it into a plain error
pub(crate) fn parse_failure(
    source: &str,
    path: &Path,
    err: &mailslot_parser::ParseError,
) -> anyhow::Error {
    eprintln!(
        "{}",
        mailslot_parser::format_error(source, &path.to_string_lossy(), err)
    );
    anyhow::anyhow!("Failed to parse {}", path.display())
}

/// Template id for a file: its stem
pub(crate) fn template_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}
