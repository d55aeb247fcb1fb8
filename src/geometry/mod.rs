use crate::{AggregateTotals, CapStyle, DisplayMode};

/// Stroke-dash length of the whole ring.
pub const CIRCUMFERENCE: f64 = 38.0;

/// Half the stroke width; a round cap protrudes this far past the arc end.
pub const CAP_ADJUSTMENT: f64 = 1.0;

/// Length of the seam tick between the additions and deletions arcs.
pub const SEAM_WIDTH: f64 = 1.0;

/// Counts the ring is drawn from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingInput {
    pub viewed_added: u64,
    pub viewed_deleted: u64,
    pub total_added: u64,
    pub total_deleted: u64,
    pub total_lines: u64,
    pub viewed_lines: u64,
}

impl From<&AggregateTotals> for RingInput {
    fn from(totals: &AggregateTotals) -> Self {
        Self {
            viewed_added: totals.viewed_added,
            viewed_deleted: totals.viewed_deleted,
            total_added: totals.total_added,
            total_deleted: totals.total_deleted,
            total_lines: totals.total_lines,
            viewed_lines: totals.viewed_lines,
        }
    }
}

/// Dash offsets for each drawn circle.
///
/// An offset of [`CIRCUMFERENCE`] draws nothing, `0` draws the full ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingOffsets {
    pub green: f64,
    pub red: f64,
    /// Seam tick offset, only present when both arcs have a share.
    pub seam: Option<f64>,
}

/// Compute the arc offsets for the given counts.
pub fn ring_offsets(input: &RingInput, mode: DisplayMode, cap: CapStyle) -> RingOffsets {
    match mode {
        DisplayMode::Unified => {
            let green_len = ratio(input.viewed_lines, input.total_lines) * CIRCUMFERENCE;
            RingOffsets {
                green: to_offset(cap_adjusted(green_len, cap)),
                red: CIRCUMFERENCE,
                seam: None,
            }
        }
        DisplayMode::Split => {
            let add_share = ratio(input.total_added, input.total_lines) * CIRCUMFERENCE;
            let del_share = ratio(input.total_deleted, input.total_lines) * CIRCUMFERENCE;

            let green_len = ratio(input.viewed_added, input.total_added) * add_share;
            let red_len = ratio(input.viewed_deleted, input.total_deleted) * del_share;

            let seam = (cap == CapStyle::Round && input.total_added > 0 && input.total_deleted > 0)
                .then(|| seam_offset(add_share));

            RingOffsets {
                green: to_offset(cap_adjusted(green_len, cap)),
                red: to_offset(cap_adjusted(red_len, cap)),
                seam,
            }
        }
    }
}

/// Dash pattern for the seam tick circle.
pub fn seam_dash_array() -> String {
    format!("{} {}", SEAM_WIDTH, CIRCUMFERENCE - SEAM_WIDTH)
}

fn seam_offset(add_share: f64) -> f64 {
    let meeting = add_share - SEAM_WIDTH / 2.0;
    CIRCUMFERENCE - meeting
}

/// `num / den`, or 0 when `den` is 0.
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn cap_adjusted(len: f64, cap: CapStyle) -> f64 {
    match cap {
        CapStyle::Round if len > 0.0 => (len - CAP_ADJUSTMENT).max(0.0),
        CapStyle::Round => 0.0,
        CapStyle::Butt => len,
    }
}

fn to_offset(len: f64) -> f64 {
    let offset = CIRCUMFERENCE - len;
    if offset.is_finite() {
        offset.clamp(0.0, CIRCUMFERENCE)
    } else {
        CIRCUMFERENCE
    }
}
