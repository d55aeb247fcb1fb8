pub mod cli;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod host;
pub mod roller;
pub mod settings;
pub mod source;
pub mod state;
pub mod tui;
pub mod widget;

/// How the ring splits viewed lines between colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Additions and deletions drawn as two arcs sharing the ring.
    #[default]
    Split,
    /// One arc for the total viewed fraction.
    Unified,
}

impl DisplayMode {
    /// Map the persisted `splitColors` preference onto a mode.
    pub fn from_split_colors(split_colors: bool) -> Self {
        if split_colors {
            DisplayMode::Split
        } else {
            DisplayMode::Unified
        }
    }
}

/// Line cap used when drawing the ring arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    /// Rounded caps, compensated so the tip lands where a flat cap would end.
    #[default]
    Round,
    /// Flat caps, no compensation and no seam marker.
    Butt,
}

/// A single file in the pull request with its change counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeRecord {
    pub path: String,
    /// Digest naming the file's diff container; files without one can't be clicked.
    pub path_digest: Option<String>,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub lines_changed: u64,
    pub viewed: bool,
}

/// Viewed vs. total line counts across all loaded files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub total_added: u64,
    pub total_deleted: u64,
    pub total_lines: u64,
    pub viewed_added: u64,
    pub viewed_deleted: u64,
    pub viewed_lines: u64,
}
