use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use mailslot_editor::{AttributeReconstructor, DocumentSession, EditorError, EngineConfig};
use mailslot_parser::format_error;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{resolve, template_id};

const TEMPLATE_EXTENSION: &str = "mjml";

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Template file or directory to lint (defaults to the templates directory)
    pub input: Option<PathBuf>,

    /// Show all diagnostics including info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub rule: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn new(level: Level, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            rule,
            message: message.into(),
        }
    }
}

pub fn lint(args: LintArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = match &args.input {
        Some(path) => resolve(cwd, path),
        None => config.get_templates_dir(cwd),
    };

    println!("🔍 {} Mailslot Linter", "Starting".green().bold());
    println!("   Input: {}", input.display());
    println!();

    let files = if input.is_file() {
        vec![input.clone()]
    } else if input.is_dir() {
        let files = find_template_files(&input);
        println!("   Found {} .{} files", files.len(), TEMPLATE_EXTENSION);
        println!();
        files
    } else {
        return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
    };

    let mut total_errors = 0;
    let mut total_warnings = 0;
    let mut total_diagnostics = 0;

    for file in &files {
        let source = fs::read_to_string(file)?;
        let diagnostics = lint_source(&source, file, &config.engine);
        report(file, &diagnostics, args.verbose, &args.format)?;

        total_diagnostics += diagnostics.len();
        total_errors += diagnostics.iter().filter(|d| d.level == Level::Error).count();
        total_warnings += diagnostics.iter().filter(|d| d.level == Level::Warning).count();
    }

    println!();
    println!(
        "✨ {} Linting complete!",
        if total_errors > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Files checked: {}", files.len());
    println!("   Total diagnostics: {}", total_diagnostics);

    if total_errors > 0 {
        println!("   {} {}", "Errors:".red(), total_errors);
    }
    if total_warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), total_warnings);
    }
    if total_errors == 0 && total_warnings == 0 {
        println!("   {} No issues found!", "✓".green());
    }

    if total_errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Check one persisted template
pub fn lint_source(source: &str, path: &Path, config: &EngineConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let corrupted = AttributeReconstructor::new(config).corrupted_count(source);
    if corrupted > 0 {
        diagnostics.push(Diagnostic::new(
            Level::Warning,
            "inline-svg-image",
            format!(
                "{} image tag(s) carry an inline SVG data URI; the source will be blanked on save",
                corrupted
            ),
        ));
    }

    let session = match DocumentSession::from_markup(&template_id(path), source, config.clone()) {
        Ok(session) => session,
        Err(EditorError::Parse(err)) => {
            diagnostics.push(Diagnostic::new(
                Level::Error,
                "parse",
                format_error(source, &path.to_string_lossy(), &err),
            ));
            return diagnostics;
        }
        Err(err) => {
            diagnostics.push(Diagnostic::new(Level::Error, "load", err.to_string()));
            return diagnostics;
        }
    };

    for (token, count) in session.slot_occurrences() {
        if count > 1 {
            diagnostics.push(Diagnostic::new(
                Level::Warning,
                "duplicate-slot",
                format!("`{}` is carried by {} nodes", token, count),
            ));
        }
    }

    if session.serialize() != source {
        diagnostics.push(Diagnostic::new(
            Level::Info,
            "round-trip",
            "persisted form changes after a load/save cycle",
        ));
    }

    diagnostics
}

fn report(file: &Path, diagnostics: &[Diagnostic], verbose: bool, format: &str) -> Result<()> {
    if diagnostics.is_empty() {
        if verbose {
            println!("{} {}", "✓".green(), file.display());
        }
        return Ok(());
    }

    if format == "json" {
        let json = serde_json::to_string_pretty(diagnostics)?;
        println!("{}", json);
        return Ok(());
    }

    println!("{}", file.display());
    for diagnostic in diagnostics {
        let level_str = match diagnostic.level {
            Level::Error => "error".red().bold(),
            Level::Warning => "warning".yellow().bold(),
            Level::Info => "info".blue().bold(),
        };

        if !verbose && diagnostic.level == Level::Info {
            continue;
        }

        println!("  {} [{}] {}", level_str, diagnostic.rule, diagnostic.message);
    }
    println!();

    Ok(())
}

fn find_template_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e == TEMPLATE_EXTENSION)
                    .unwrap_or(false)
        })
        .collect()
}
