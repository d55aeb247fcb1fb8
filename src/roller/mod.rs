use std::time::{Duration, Instant};

/// How long a roll from one value to another takes.
pub const ROLL_DURATION: Duration = Duration::from_millis(350);

/// One decimal place of the odometer counter.
///
/// The strip holds the glyphs `0..=9` stacked vertically; only its offset
/// changes when the displayed digit changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitStrip {
    pub digit: u8,
    /// Leading padding zero, drawn in the secondary text color.
    pub muted: bool,
}

impl DigitStrip {
    /// Vertical offset of the strip in digit heights.
    pub fn offset(&self) -> i32 {
        -i32::from(self.digit)
    }
}

/// Number of decimal digits in `n`; zero has one digit.
pub fn digit_count(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Lay out `value` as zero-padded strips as wide as `max`.
pub fn layout(value: u64, max: u64) -> Vec<DigitStrip> {
    let natural = digit_count(value);
    let width = digit_count(max).max(natural);
    let padded = format!("{value:0width$}");
    let leading = width - natural;

    padded
        .bytes()
        .enumerate()
        .map(|(i, b)| DigitStrip {
            digit: b - b'0',
            muted: i < leading,
        })
        .collect()
}

/// Render strips back to the string they display.
pub fn display(strips: &[DigitStrip]) -> String {
    strips.iter().map(|s| char::from(b'0' + s.digit)).collect()
}

/// Cubic ease-out for `t` in `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// A running transition of the counter between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollerAnimation {
    from: u64,
    to: u64,
    started: Instant,
}

/// A sampled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollerFrame {
    pub value: u64,
    /// The animation reached its target and needs no more frames.
    pub done: bool,
}

impl RollerAnimation {
    /// Start a roll, or `None` if there is nothing to animate.
    pub fn start(from: u64, to: u64, now: Instant) -> Option<Self> {
        (from != to).then_some(Self {
            from,
            to,
            started: now,
        })
    }

    /// Value to show at `now`.
    pub fn sample(&self, now: Instant) -> RollerFrame {
        let elapsed = now.saturating_duration_since(self.started);
        let t = (elapsed.as_secs_f64() / ROLL_DURATION.as_secs_f64()).min(1.0);
        if t >= 1.0 {
            return RollerFrame {
                value: self.to,
                done: true,
            };
        }

        let from = self.from as f64;
        let delta = self.to as f64 - from;
        let current = (from + delta * ease_out_cubic(t)).round();
        let (lo, hi) = (self.from.min(self.to), self.from.max(self.to));

        RollerFrame {
            value: (current.max(0.0) as u64).clamp(lo, hi),
            done: false,
        }
    }
}
