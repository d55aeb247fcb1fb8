use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lines-viewed",
    about = "Lines-viewed progress indicator for pull request review pages"
)]
pub struct Cli {
    /// Settings database holding the persisted display preference.
    #[arg(long, global = true, default_value = ".lines-viewed/settings.db")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the indicator markup for a saved page.
    Render(RenderArgs),
    /// Print the indicator tooltip for a saved page.
    Status(PageArgs),
    /// Open the interactive terminal preview.
    Preview(PreviewArgs),
    /// Show or change the persisted display preference.
    Settings(SettingsArgs),
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Saved page: one embedded JSON document, or a JSON array of script bodies.
    #[arg(short, long)]
    pub page: PathBuf,

    /// Click the viewed button of this file before rendering (repeatable).
    #[arg(long = "viewed", value_name = "PATH")]
    pub viewed: Vec<String>,

    /// Draw one arc for all viewed lines.
    #[arg(long, conflicts_with = "split")]
    pub unified: bool,

    /// Draw additions and deletions as separate arcs.
    #[arg(long)]
    pub split: bool,

    /// Flat line caps instead of rounded ones.
    #[arg(long)]
    pub flat_caps: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Wrap the markup in the widget container element.
    #[arg(long)]
    pub container: bool,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Saved page: one embedded JSON document, or a JSON array of script bodies.
    #[arg(short, long)]
    pub page: PathBuf,

    /// Flat line caps instead of rounded ones.
    #[arg(long)]
    pub flat_caps: bool,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Persist whether additions and deletions get separate colors.
    #[arg(long, value_name = "BOOL")]
    pub split_colors: Option<bool>,
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
