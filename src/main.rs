use anyhow::{Context, Result, bail};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use lines_viewed::cli::{self, Commands, PageArgs, RenderArgs, SettingsArgs};
use lines_viewed::controller::IndicatorController;
use lines_viewed::host::{self, MemoryPage};
use lines_viewed::roller::ROLL_DURATION;
use lines_viewed::settings::{self, SettingsDb};
use lines_viewed::source::scripts_from_dump;
use lines_viewed::tui::{Preview, run_tui};
use lines_viewed::widget::Widget;
use lines_viewed::{CapStyle, DisplayMode};

fn main() -> Result<()> {
    let args = cli::parse_args();

    // The preview owns the terminal; only log there when explicitly asked.
    let interactive = matches!(args.command, Commands::Preview(_));
    init_logging(interactive);

    match args.command {
        Commands::Render(render_args) => {
            handle_render(&args.settings, &render_args)?;
        }
        Commands::Status(page_args) => {
            let page = load_page(&args.settings, &page_args)?;
            println!("{}", mounted_widget(&page)?.tooltip);
        }
        Commands::Preview(preview_args) => {
            let scripts = read_dump(&preview_args.page)?;
            let db = open_settings(&args.settings)?;
            let cap = cap_style(preview_args.flat_caps);
            let app = Preview::new(scripts, db, cap).context("Failed to load page")?;
            run_tui(app)?;
        }
        Commands::Settings(settings_args) => {
            handle_settings(&args.settings, &settings_args)?;
        }
    }

    Ok(())
}

/// Install the stderr log subscriber, filtered by `RUST_LOG`.
fn init_logging(interactive: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if interactive => return,
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handle the render command - print the widget markup.
fn handle_render(settings_path: &Path, args: &RenderArgs) -> Result<()> {
    let page = load_page(settings_path, &args.page)?;
    let widget = mounted_widget(&page)?;

    if args.container {
        println!("{}", widget.to_container_markup());
    } else {
        println!("{}", widget.to_markup());
    }
    Ok(())
}

/// Handle the settings command - show or persist the display preference.
fn handle_settings(settings_path: &Path, args: &SettingsArgs) -> Result<()> {
    match args.split_colors {
        Some(split_colors) => {
            let mut db = open_settings(settings_path)?;
            let message = settings::store_split_colors(&mut db, split_colors)
                .context("Failed to save settings")?;
            println!(
                "{}",
                serde_json::to_string(&message).context("Failed to encode settings message")?
            );
        }
        None => {
            let split_colors = read_split_colors(settings_path)?;
            println!("splitColors = {}", split_colors);
        }
    }
    Ok(())
}

/// Mount the indicator on a saved page and replay the requested clicks.
fn load_page(settings_path: &Path, args: &PageArgs) -> Result<MemoryPage> {
    let mode = if args.unified {
        DisplayMode::Unified
    } else if args.split {
        DisplayMode::Split
    } else {
        DisplayMode::from_split_colors(read_split_colors(settings_path)?)
    };

    let mut page = MemoryPage::new(read_dump(&args.page)?);
    let mut controller = IndicatorController::new(mode, cap_style(args.flat_caps));
    controller
        .rescan(&mut page)
        .with_context(|| format!("Cannot show indicator for {}", args.page.display()))?;

    for path in &args.viewed {
        let digest = match controller
            .session()
            .and_then(|session| session.state().get(path))
        {
            Some(file) => file.path_digest.clone(),
            None => bail!("Unknown file: {}", path),
        };
        let Some(digest) = digest else {
            bail!("File has no diff container: {}", path);
        };
        controller.handle_viewed_click(&mut page, &host::container_id(&digest))?;
    }

    // Settle any counter roll immediately.
    while let Some(frame) = page.take_frame() {
        controller.on_frame(&mut page, frame, Instant::now() + ROLL_DURATION);
    }

    Ok(page)
}

fn mounted_widget(page: &MemoryPage) -> Result<&Widget> {
    page.widget().context("Indicator is not mounted")
}

fn read_dump(path: &Path) -> Result<Vec<String>> {
    let dump = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page dump {}", path.display()))?;
    Ok(scripts_from_dump(&dump))
}

fn open_settings(path: &Path) -> Result<SettingsDb> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    SettingsDb::open(path).context("Failed to open settings database")
}

/// Read the persisted preference without creating the database.
fn read_split_colors(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let db = SettingsDb::open(path).context("Failed to open settings database")?;
    db.split_colors().context("Failed to read settings")
}

fn cap_style(flat_caps: bool) -> CapStyle {
    if flat_caps {
        CapStyle::Butt
    } else {
        CapStyle::Round
    }
}
