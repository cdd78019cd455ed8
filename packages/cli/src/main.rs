mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{blank, forward, lint, reverse, BlankArgs, ForwardArgs, LintArgs, ReverseArgs};

/// Mailslot CLI - slot transforms for MJML email templates
#[derive(Parser, Debug)]
#[command(name = "mailslot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a persisted template to the editable form
    Forward(ForwardArgs),

    /// Convert editable markup back to the persisted form
    Reverse(ReverseArgs),

    /// Check templates for parse errors, duplicate slots and inline images
    Lint(LintArgs),

    /// Create a new template from the blank skeleton
    Blank(BlankArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Forward(args) => forward(args, &cwd),
        Command::Reverse(args) => reverse(args, &cwd),
        Command::Lint(args) => lint(args, &cwd),
        Command::Blank(args) => blank(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
