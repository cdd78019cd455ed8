use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use mailslot_editor::{FileTemplateStore, TemplateStore, BLANK_TEMPLATE};

#[derive(Debug, Args)]
pub struct BlankArgs {
    /// Template id; the file is `<id>.mjml` in the templates directory
    pub name: String,

    /// Force overwrite an existing template
    #[arg(short, long)]
    pub force: bool,
}

pub fn blank(args: BlankArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut store = FileTemplateStore::new(config.get_templates_dir(cwd));
    let path = store.path_for(&args.name);

    if path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            path.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    store.save_template(&args.name, BLANK_TEMPLATE)?;
    println!("  {} Created {}", "✓".green(), path.display());
    Ok(())
}
