//! The composite indicator: ring, odometer counter and hover tooltip.
//!
//! [`Widget`] is a retained model of what is on the page. The controller
//! builds one on mount and on mode changes, and sends [`WidgetPatch`]es for
//! incremental updates. Hosts either mirror the model (see [`Widget::apply`])
//! or translate patches into attribute writes on their own nodes.

use crate::geometry::{self, CIRCUMFERENCE, RingInput, RingOffsets};
use crate::roller::{self, DigitStrip};
use crate::{AggregateTotals, CapStyle, DisplayMode};
use std::fmt::Write as _;

/// Element id the mounted widget carries; its absence means "not mounted".
pub const WIDGET_ID: &str = "glv-lines-viewed";

const MUTED_COLOR: &str = "var(--fgColor-muted, var(--color-fg-muted))";
const BORDER_COLOR: &str = "var(--borderColor-default, var(--color-border-default))";
const SUCCESS_COLOR: &str = "var(--fgColor-success, var(--color-success-fg))";
const DANGER_COLOR: &str = "var(--fgColor-danger, var(--color-danger-fg))";

/// Everything needed to draw the indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub mode: DisplayMode,
    pub cap: CapStyle,
    pub ring: RingOffsets,
    pub digits: Vec<DigitStrip>,
    /// Viewed total the counter was last asked to settle on.
    pub shown_viewed: u64,
    pub total_lines: u64,
    pub tooltip: String,
}

/// Incremental change to a mounted widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetPatch {
    /// Replace the whole widget content.
    Rebuild(Widget),
    /// New arc offsets; `red` is `None` when no deletions arc is drawn.
    Ring { green: f64, red: Option<f64> },
    /// New digit strip positions.
    Digits(Vec<DigitStrip>),
    /// New settled counter value, recorded on the widget.
    Viewed(u64),
    Tooltip(String),
}

impl Widget {
    pub fn build(totals: &AggregateTotals, mode: DisplayMode, cap: CapStyle) -> Self {
        Self {
            mode,
            cap,
            ring: geometry::ring_offsets(&RingInput::from(totals), mode, cap),
            digits: roller::layout(totals.viewed_lines, totals.total_lines),
            shown_viewed: totals.viewed_lines,
            total_lines: totals.total_lines,
            tooltip: tooltip(totals, mode),
        }
    }

    /// Mirror a patch onto this model.
    pub fn apply(&mut self, patch: WidgetPatch) {
        match patch {
            WidgetPatch::Rebuild(widget) => *self = widget,
            WidgetPatch::Ring { green, red } => {
                self.ring.green = green;
                // Without a red circle there is nothing to update.
                if let (Some(red), DisplayMode::Split) = (red, self.mode) {
                    self.ring.red = red;
                }
            }
            WidgetPatch::Digits(digits) => self.digits = digits,
            WidgetPatch::Viewed(viewed) => self.shown_viewed = viewed,
            WidgetPatch::Tooltip(text) => self.tooltip = text,
        }
    }

    /// Counter text currently shown by the strips.
    pub fn counter(&self) -> String {
        roller::display(&self.digits)
    }

    /// Render the inner markup of the widget container.
    pub fn to_markup(&self) -> String {
        let mut svg = String::new();
        let linecap = match self.cap {
            CapStyle::Round => "round",
            CapStyle::Butt => "butt",
        };

        let _ = write!(
            svg,
            r#"<svg data-circumference="{CIRCUMFERENCE}" height="16" width="16" role="presentation" style="transform: rotate(-90deg);">"#
        );
        let _ = write!(
            svg,
            r#"<circle cx="50%" cy="50%" fill="transparent" r="6" stroke="{BORDER_COLOR}" stroke-width="2"></circle>"#
        );
        let _ = write!(
            svg,
            r#"<circle data-glv="green" cx="50%" cy="50%" fill="transparent" r="6" stroke="{SUCCESS_COLOR}" stroke-dasharray="{CIRCUMFERENCE}" stroke-dashoffset="{}" stroke-linecap="{linecap}" stroke-width="2" style="transition: stroke-dashoffset 0.35s;"></circle>"#,
            self.ring.green
        );

        if self.mode == DisplayMode::Split {
            let _ = write!(
                svg,
                r#"<circle data-glv="red" cx="50%" cy="50%" fill="transparent" r="6" stroke="{DANGER_COLOR}" stroke-dasharray="{CIRCUMFERENCE}" stroke-dashoffset="{}" stroke-linecap="{linecap}" stroke-width="2" style="transition: stroke-dashoffset 0.35s; transform: scaleY(-1); transform-origin: center;"></circle>"#,
                self.ring.red
            );
            if let Some(seam) = self.ring.seam {
                let _ = write!(
                    svg,
                    r#"<circle cx="50%" cy="50%" fill="transparent" r="6" stroke="white" stroke-dasharray="{}" stroke-dashoffset="{seam}" stroke-width="2"></circle>"#,
                    geometry::seam_dash_array()
                );
            }
        }
        svg.push_str("</svg>");

        format!(
            r#"{svg}<span class="ml-1" style="font-size: 12px; white-space: nowrap; font-variant-numeric: tabular-nums;">{} / <span style="font-weight:600">{}</span> <span style="color:{MUTED_COLOR}">lines</span></span>"#,
            self.roller_markup(),
            self.total_lines
        )
    }

    /// Render the widget together with its container element.
    pub fn to_container_markup(&self) -> String {
        format!(
            r#"<div id="{WIDGET_ID}" class="d-flex flex-items-center" style="display: flex; align-items: center; gap: 0px; cursor: help;" title="{}">{}</div>"#,
            escape_attr(&self.tooltip),
            self.to_markup()
        )
    }

    fn roller_markup(&self) -> String {
        let mut out = String::from(
            r#"<span data-glv="viewed" style="font-weight:600; display:inline-flex; height:1em; line-height:1; overflow:hidden;">"#,
        );
        for strip in &self.digits {
            let color = if strip.muted {
                format!(" color:{MUTED_COLOR};")
            } else {
                String::new()
            };
            let _ = write!(
                out,
                r#"<span data-glv-digit style="display:flex; flex-direction:column; transform:translateY({}em);{color}">"#,
                strip.offset()
            );
            for d in 0..=9 {
                let _ = write!(out, r#"<span style="height:1em">{d}</span>"#);
            }
            out.push_str("</span>");
        }
        out.push_str("</span>");
        out
    }
}

/// Hover text for the indicator.
pub fn tooltip(totals: &AggregateTotals, mode: DisplayMode) -> String {
    let mut text = format!(
        "Lines viewed: {} / {}",
        totals.viewed_lines, totals.total_lines
    );
    if mode == DisplayMode::Split {
        let _ = write!(
            text,
            "\n+{} / +{} additions\n-{} / -{} deletions",
            totals.viewed_added, totals.total_added, totals.viewed_deleted, totals.total_deleted
        );
    }
    text
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(ch),
        }
    }
    out
}
