use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::time::{Duration, Instant};

use crate::controller::IndicatorController;
use crate::geometry::CIRCUMFERENCE;
use crate::host::{self, MemoryPage};
use crate::settings::{self, SettingsDb};
use crate::widget::Widget;
use crate::{CapStyle, DisplayMode, FileChangeRecord};

/// One cell of the ring, unrolled clockwise from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingCell {
    Track,
    Added,
    Deleted,
    Seam,
}

/// Unroll the ring into one cell per circumference unit.
///
/// The additions arc grows clockwise from the top and the deletions arc
/// counter-clockwise, so viewed deletions fill the tail of the strip.
pub fn ring_cells(widget: &Widget) -> Vec<RingCell> {
    let cells = CIRCUMFERENCE as usize;
    let green_len = CIRCUMFERENCE - widget.ring.green;
    let red_len = match widget.mode {
        DisplayMode::Split => CIRCUMFERENCE - widget.ring.red,
        DisplayMode::Unified => 0.0,
    };
    let seam_cell = widget
        .ring
        .seam
        .filter(|_| widget.mode == DisplayMode::Split)
        .map(|offset| (CIRCUMFERENCE - offset + 0.5).floor() as usize);

    (0..cells)
        .map(|i| {
            let mid = i as f64 + 0.5;
            if seam_cell == Some(i) {
                RingCell::Seam
            } else if mid < green_len {
                RingCell::Added
            } else if CIRCUMFERENCE - mid < red_len {
                RingCell::Deleted
            } else {
                RingCell::Track
            }
        })
        .collect()
}

/// Terminal preview of the indicator acting as the host page.
pub struct Preview {
    page: MemoryPage,
    controller: IndicatorController,
    settings: SettingsDb,
    selected: usize,
    should_quit: bool,
    show_help: bool,
    status_message: Option<(String, Instant)>,
}

impl Preview {
    /// Mount the indicator on a page built from `scripts`.
    ///
    /// The display mode comes from the persisted preference.
    pub fn new(scripts: Vec<String>, settings: SettingsDb, cap: CapStyle) -> Result<Self> {
        let split_colors = settings
            .split_colors()
            .context("Failed to read settings")?;
        let mut page = MemoryPage::new(scripts).with_divider_class("preview-divider");
        let mut controller =
            IndicatorController::new(DisplayMode::from_split_colors(split_colors), cap);
        controller.rescan(&mut page)?;

        Ok(Self {
            page,
            controller,
            settings,
            selected: 0,
            should_quit: false,
            show_help: false,
            status_message: None,
        })
    }

    fn files(&self) -> &[FileChangeRecord] {
        self.controller
            .session()
            .map(|session| session.state().files())
            .unwrap_or(&[])
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Handle keyboard input.
    fn handle_input(&mut self, key: event::KeyEvent) -> Result<()> {
        if self.show_help {
            // Any key closes help
            self.show_help = false;
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.files().len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char(' ') | KeyCode::Char('v') => {
                self.click_viewed();
            }
            KeyCode::Char('c') => {
                self.toggle_colors()?;
            }
            KeyCode::Char('r') => {
                self.reload();
            }
            _ => {}
        }
        Ok(())
    }

    /// Press the viewed button of the selected file.
    fn click_viewed(&mut self) {
        let Some(file) = self.files().get(self.selected) else {
            return;
        };
        let Some(digest) = &file.path_digest else {
            let message = format!("{} has no diff container", file.path);
            self.set_status(message);
            return;
        };
        let container = host::container_id(digest);
        self.controller.on_viewed_click(&mut self.page, &container);
    }

    /// Flip the persisted color preference and push it to the page.
    fn toggle_colors(&mut self) -> Result<()> {
        let message = settings::toggle_split_colors(&mut self.settings)
            .context("Failed to save settings")?;
        self.controller.handle_message(&mut self.page, &message);
        let label = match self.controller.mode() {
            DisplayMode::Split => "split",
            DisplayMode::Unified => "unified",
        };
        self.set_status(format!("Colors: {label}"));
        Ok(())
    }

    /// Re-render the page: the widget disappears and is mounted afresh.
    fn reload(&mut self) {
        self.page.remove_widget();
        self.controller.on_page_mutation(&mut self.page);
        self.selected = 0;
        if let Some(session) = self.controller.session() {
            let generation = session.generation();
            self.set_status(format!("Page reloaded (generation {generation})"));
        }
    }

    /// Deliver a pending animation frame, if any.
    fn run_frame(&mut self) {
        if let Some(frame) = self.page.take_frame() {
            self.controller
                .on_frame(&mut self.page, frame, Instant::now());
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        // Expire old status messages
        let expired = self
            .status_message
            .as_ref()
            .map(|(_, time)| time.elapsed() >= Duration::from_secs(3))
            .unwrap_or(false);
        if expired {
            self.status_message = None;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(5),
            ])
            .split(frame.area());

        self.render_indicator(frame, chunks[0]);
        self.render_file_list(frame, chunks[1]);
        self.render_status_bar(frame, chunks[2]);

        if self.show_help {
            self.render_help(frame);
        }
    }

    /// Render the ring strip and counter.
    fn render_indicator(&self, frame: &mut Frame, area: Rect) {
        let Some(widget) = self.page.widget() else {
            let paragraph = Paragraph::new("Indicator not mounted")
                .block(Block::default().borders(Borders::ALL).title("Lines viewed"));
            frame.render_widget(paragraph, area);
            return;
        };

        let mut spans: Vec<Span> = Vec::new();
        if self.page.mounted_divider().is_some() {
            spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
        }
        spans.extend(ring_cells(widget).into_iter().map(|cell| {
            let color = match cell {
                RingCell::Track => Color::DarkGray,
                RingCell::Added => Color::Green,
                RingCell::Deleted => Color::Red,
                RingCell::Seam => Color::White,
            };
            Span::styled("█", Style::default().fg(color))
        }));

        spans.push(Span::raw("  "));
        for strip in &widget.digits {
            let style = if strip.muted {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            spans.push(Span::styled(strip.digit.to_string(), style));
        }
        spans.push(Span::raw(" / "));
        spans.push(Span::styled(
            widget.total_lines.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(" lines", Style::default().fg(Color::DarkGray)));

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Lines viewed"));
        frame.render_widget(paragraph, area);
    }

    /// Render the file list panel.
    fn render_file_list(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .files()
            .iter()
            .enumerate()
            .map(|(idx, file)| {
                let mark = if file.viewed { "[x]" } else { "[ ]" };
                let color = if file.viewed {
                    Color::Green
                } else {
                    Color::Reset
                };
                let style = if idx == self.selected {
                    Style::default().fg(color).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(color)
                };
                let prefix = if idx == self.selected { ">" } else { " " };

                ListItem::new(format!(
                    "{} {} {}  +{} -{}",
                    prefix, mark, file.path, file.lines_added, file.lines_deleted
                ))
                .style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Files (Space to toggle viewed)"),
        );

        frame.render_widget(list, area);
    }

    /// Render the tooltip and key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self
            .page
            .widget()
            .map(|widget| widget.tooltip.lines().map(Line::from).collect())
            .unwrap_or_default();

        let hint = match &self.status_message {
            Some((msg, _)) => msg.clone(),
            None => "j/k: navigate  Space: viewed  c: colors  r: reload  ?: help  q: quit"
                .to_string(),
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::Cyan),
        )));

        let paragraph = Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    /// Render the help overlay.
    fn render_help(&self, frame: &mut Frame) {
        let help_text = [
            "Lines Viewed - Keyboard Shortcuts",
            "",
            "Navigation:",
            "  j / Down      - Next file",
            "  k / Up        - Previous file",
            "",
            "Actions:",
            "  Space / v     - Toggle viewed",
            "  c             - Toggle split colors (saved)",
            "  r             - Reload page",
            "",
            "Other:",
            "  ?             - Show this help",
            "  q / Esc       - Quit",
            "",
            "Press any key to close this help",
        ];

        let text = Text::from(help_text.iter().map(|&s| Line::from(s)).collect::<Vec<_>>());

        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });

        let area = centered_rect(60, 80, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Setup the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Launch the interactive preview.
pub fn run_tui(mut app: Preview) -> Result<()> {
    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;

    // Main event loop
    let result = (|| -> Result<()> {
        loop {
            app.run_frame();

            terminal
                .draw(|f| app.render(f))
                .context("Failed to draw frame")?;

            if app.should_quit {
                break;
            }

            // Poll at frame rate while the counter is rolling.
            let timeout = if app.page.has_pending_frame() {
                Duration::from_millis(16)
            } else {
                Duration::from_millis(200)
            };

            if event::poll(timeout).context("Failed to poll events")?
                && let Event::Key(key) = event::read().context("Failed to read event")?
            {
                // Ignore key release events
                if key.kind == event::KeyEventKind::Press {
                    app.handle_input(key)?;
                }
            }
        }
        Ok(())
    })();

    // Restore terminal in all cases
    restore_terminal(&mut terminal)?;

    result
}
