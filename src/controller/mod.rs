//! Mounting, rebuilding and incrementally updating the indicator.
//!
//! The controller is either *absent* (no session) or *mounted* (a
//! [`ReviewIndicatorSession`] bound to one load of the page). Every entry
//! point takes `&mut self`, so events are handled strictly one after another.

use std::time::Instant;
use tracing::{debug, info};

use crate::error::{IndicatorError, Result};
use crate::geometry::{self, RingInput};
use crate::host::{self, FrameId, PageHost};
use crate::roller::{self, RollerAnimation};
use crate::settings::ModeMessage;
use crate::source;
use crate::state::ReviewState;
use crate::widget::{self, Widget, WidgetPatch};
use crate::{CapStyle, DisplayMode, FileChangeRecord};

/// Result of a mount attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The widget is still on the page; nothing to do.
    AlreadyMounted,
    /// A new session was loaded and the widget inserted.
    Mounted { generation: u64 },
}

#[derive(Debug, Clone, Copy)]
struct ActiveRoll {
    animation: RollerAnimation,
    frame: FrameId,
}

/// State owned by one mounted widget.
#[derive(Debug)]
pub struct ReviewIndicatorSession {
    generation: u64,
    state: ReviewState,
    /// Viewed total the counter is showing or rolling towards.
    shown_viewed: u64,
    roll: Option<ActiveRoll>,
}

impl ReviewIndicatorSession {
    fn new(generation: u64, state: ReviewState) -> Self {
        let shown_viewed = state.aggregates().viewed_lines;
        Self {
            generation,
            state,
            shown_viewed,
            roll: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn shown_viewed(&self) -> u64 {
        self.shown_viewed
    }

    pub fn is_rolling(&self) -> bool {
        self.roll.is_some()
    }

    fn cancel_roll<H: PageHost>(&mut self, host: &mut H) {
        if let Some(roll) = self.roll.take() {
            host.cancel_frame(roll.frame);
        }
    }

    /// Roll the counter from `from` to `to`, replacing any running roll.
    fn start_roll<H: PageHost>(&mut self, host: &mut H, from: u64, to: u64) {
        // Same target: a running roll is already heading there.
        let Some(animation) = RollerAnimation::start(from, to, host.now()) else {
            return;
        };
        self.cancel_roll(host);
        let frame = host.request_frame();
        self.roll = Some(ActiveRoll { animation, frame });
    }
}

/// Drives the indicator on one page.
#[derive(Debug, Default)]
pub struct IndicatorController {
    mode: DisplayMode,
    cap: CapStyle,
    session: Option<ReviewIndicatorSession>,
    generations: u64,
}

impl IndicatorController {
    pub fn new(mode: DisplayMode, cap: CapStyle) -> Self {
        Self {
            mode,
            cap,
            session: None,
            generations: 0,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn cap(&self) -> CapStyle {
        self.cap
    }

    pub fn session(&self) -> Option<&ReviewIndicatorSession> {
        self.session.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Mount the widget if it is missing from the page.
    ///
    /// A widget that disappeared takes its session with it; the next
    /// successful mount loads a fresh generation.
    pub fn rescan<H: PageHost>(&mut self, host: &mut H) -> Result<MountOutcome> {
        if host.widget_present() {
            return Ok(MountOutcome::AlreadyMounted);
        }

        if let Some(mut old) = self.session.take() {
            debug!(generation = old.generation, "indicator removed from page");
            old.cancel_roll(host);
        }

        let anchor = host
            .toolbar_anchor()
            .ok_or(IndicatorError::AnchorMissing)?;

        let mut state = ReviewState::new();
        if !state.load(source::find_diff_summaries(host.json_scripts())) {
            return Err(IndicatorError::DataUnavailable);
        }

        self.generations += 1;
        let session = ReviewIndicatorSession::new(self.generations, state);
        let totals = session.state.aggregates();
        let widget = Widget::build(&totals, self.mode, self.cap);

        let divider = host.divider_class();
        host.mount(&anchor, divider.as_deref(), &widget);

        info!(
            generation = session.generation,
            files = session.state.len(),
            total_lines = totals.total_lines,
            viewed_lines = totals.viewed_lines,
            "indicator mounted"
        );

        let generation = session.generation;
        self.session = Some(session);
        Ok(MountOutcome::Mounted { generation })
    }

    /// Switch display mode, rebuilding a mounted widget in place.
    pub fn set_display_mode<H: PageHost>(&mut self, host: &mut H, mode: DisplayMode) {
        self.mode = mode;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !host.widget_present() {
            return;
        }

        // The rebuilt counter shows the settled value directly.
        session.cancel_roll(host);
        let totals = session.state.aggregates();
        session.shown_viewed = totals.viewed_lines;
        host.apply(WidgetPatch::Rebuild(Widget::build(&totals, mode, self.cap)));
        info!(?mode, "indicator rebuilt");
    }

    /// React to a display-mode message; messages without the flag are ignored.
    pub fn handle_message<H: PageHost>(&mut self, host: &mut H, message: &ModeMessage) {
        if let Some(split_colors) = message.split_colors {
            self.set_display_mode(host, DisplayMode::from_split_colors(split_colors));
        }
    }

    /// Flip the viewed flag of the file whose diff container was clicked.
    ///
    /// Returns the updated record. Unknown or stale references change nothing.
    pub fn handle_viewed_click<H: PageHost>(
        &mut self,
        host: &mut H,
        container_id: &str,
    ) -> Result<FileChangeRecord> {
        let unknown = || IndicatorError::UnknownFileReference(container_id.to_string());

        let session = self.session.as_mut().ok_or_else(unknown)?;
        let digest = host::digest_from_container_id(container_id).ok_or_else(unknown)?;
        let path = session
            .state
            .resolve_path_by_digest(digest)
            .ok_or_else(unknown)?
            .to_string();
        let record = session
            .state
            .toggle_viewed(&path)
            .ok_or_else(unknown)?
            .clone();

        debug!(path = %record.path, viewed = record.viewed, "viewed flag toggled");

        if host.widget_present() {
            let totals = session.state.aggregates();
            let ring = geometry::ring_offsets(&RingInput::from(&totals), self.mode, self.cap);
            host.apply(WidgetPatch::Ring {
                green: ring.green,
                red: (self.mode == DisplayMode::Split).then_some(ring.red),
            });

            let from = session.shown_viewed;
            session.shown_viewed = totals.viewed_lines;
            host.apply(WidgetPatch::Viewed(totals.viewed_lines));
            session.start_roll(host, from, totals.viewed_lines);

            host.apply(WidgetPatch::Tooltip(widget::tooltip(&totals, self.mode)));
        }

        Ok(record)
    }

    /// Advance the counter roll for an animation frame callback.
    pub fn on_frame<H: PageHost>(&mut self, host: &mut H, frame: FrameId, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(roll) = session.roll.as_mut() else {
            return;
        };
        if roll.frame != frame {
            return;
        }

        let sample = roll.animation.sample(now);
        let total = session.state.aggregates().total_lines;
        host.apply(WidgetPatch::Digits(roller::layout(sample.value, total)));

        if sample.done {
            session.roll = None;
        } else {
            roll.frame = host.request_frame();
        }
    }

    /// Page changed: try to mount, deferring quietly on failure.
    pub fn on_page_mutation<H: PageHost>(&mut self, host: &mut H) {
        if let Err(e) = self.rescan(host) {
            debug!(error = %e, "mount deferred");
        }
    }

    /// Viewed button clicked: update, dropping unknown references quietly.
    pub fn on_viewed_click<H: PageHost>(&mut self, host: &mut H, container_id: &str) {
        if let Err(e) = self.handle_viewed_click(host, container_id) {
            debug!(error = %e, "click ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CIRCUMFERENCE;
    use crate::roller::ROLL_DURATION;
    use std::time::Duration;

    /// In-memory page that records what the controller does to it.
    struct FakePage {
        scripts: Vec<String>,
        has_toolbar: bool,
        divider: Option<String>,
        mounted_divider: Option<String>,
        widget: Option<Widget>,
        mounts: usize,
        patches: Vec<WidgetPatch>,
        next_frame: u64,
        pending: Option<FrameId>,
        cancelled: Vec<FrameId>,
        clock: Instant,
    }

    impl FakePage {
        fn new(scripts: Vec<String>) -> Self {
            Self {
                scripts,
                has_toolbar: true,
                divider: None,
                mounted_divider: None,
                widget: None,
                mounts: 0,
                patches: Vec::new(),
                next_frame: 0,
                pending: None,
                cancelled: Vec::new(),
                clock: Instant::now(),
            }
        }

        fn widget(&self) -> &Widget {
            self.widget.as_ref().unwrap()
        }

        fn advance(&mut self, by: Duration) {
            self.clock += by;
        }
    }

    impl PageHost for FakePage {
        type Anchor = ();

        fn json_scripts(&self) -> Vec<String> {
            self.scripts.clone()
        }

        fn toolbar_anchor(&self) -> Option<()> {
            self.has_toolbar.then_some(())
        }

        fn divider_class(&self) -> Option<String> {
            self.divider.clone()
        }

        fn widget_present(&self) -> bool {
            self.widget.is_some()
        }

        fn mount(&mut self, _anchor: &(), divider_class: Option<&str>, widget: &Widget) {
            self.mounts += 1;
            self.mounted_divider = divider_class.map(str::to_string);
            self.widget = Some(widget.clone());
        }

        fn apply(&mut self, patch: WidgetPatch) {
            self.patches.push(patch.clone());
            if let Some(widget) = self.widget.as_mut() {
                widget.apply(patch);
            }
        }

        fn now(&self) -> Instant {
            self.clock
        }

        fn request_frame(&mut self) -> FrameId {
            self.next_frame += 1;
            let frame = FrameId(self.next_frame);
            self.pending = Some(frame);
            frame
        }

        fn cancel_frame(&mut self, frame: FrameId) {
            self.cancelled.push(frame);
            if self.pending == Some(frame) {
                self.pending = None;
            }
        }
    }

    fn page_script(files: &[(&str, &str, u64, u64, bool)]) -> String {
        let summaries: Vec<serde_json::Value> = files
            .iter()
            .map(|(path, digest, added, deleted, viewed)| {
                serde_json::json!({
                    "path": path,
                    "pathDigest": digest,
                    "linesAdded": added,
                    "linesDeleted": deleted,
                    "linesChanged": added + deleted,
                    "markedAsViewed": viewed,
                })
            })
            .collect();
        serde_json::json!({
            "payload": {"pullRequestsChangesRoute": {"diffSummaries": summaries}}
        })
        .to_string()
    }

    fn two_file_page() -> FakePage {
        FakePage::new(vec![page_script(&[
            ("a.txt", "d1", 5, 0, false),
            ("b.txt", "d2", 2, 1, true),
        ])])
    }

    /// Run frames until the roll settles, stepping the clock 16ms at a time.
    fn run_frames(controller: &mut IndicatorController, page: &mut FakePage) {
        while let Some(frame) = page.pending.take() {
            page.advance(Duration::from_millis(16));
            let now = page.clock;
            controller.on_frame(page, frame, now);
        }
    }

    #[test]
    fn mounts_when_anchor_and_data_present() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();

        let outcome = controller.rescan(&mut page).unwrap();
        assert_eq!(outcome, MountOutcome::Mounted { generation: 1 });
        assert_eq!(page.widget().counter(), "3");
        assert_eq!(page.widget().total_lines, 8);
        assert_eq!(
            controller.session().unwrap().state().aggregates().viewed_lines,
            3
        );
    }

    #[test]
    fn rescan_while_mounted_is_noop() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();

        assert_eq!(
            controller.rescan(&mut page).unwrap(),
            MountOutcome::AlreadyMounted
        );
        assert_eq!(page.mounts, 1);
    }

    #[test]
    fn missing_anchor_defers_mount() {
        let mut page = two_file_page();
        page.has_toolbar = false;
        let mut controller = IndicatorController::default();

        assert_eq!(
            controller.rescan(&mut page),
            Err(IndicatorError::AnchorMissing)
        );
        assert!(!controller.is_mounted());

        page.has_toolbar = true;
        assert!(controller.rescan(&mut page).is_ok());
        assert!(controller.is_mounted());
    }

    #[test]
    fn missing_data_defers_mount() {
        let mut page = FakePage::new(vec!["{}".to_string()]);
        let mut controller = IndicatorController::default();

        assert_eq!(
            controller.rescan(&mut page),
            Err(IndicatorError::DataUnavailable)
        );
        assert!(!controller.is_mounted());
        assert_eq!(page.mounts, 0);
    }

    #[test]
    fn removed_widget_remounts_with_new_generation() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();
        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();

        // Navigation to another pull request.
        page.widget = None;
        page.scripts = vec![page_script(&[("c.txt", "d3", 4, 4, false)])];

        let outcome = controller.rescan(&mut page).unwrap();
        assert_eq!(outcome, MountOutcome::Mounted { generation: 2 });
        let session = controller.session().unwrap();
        assert!(session.state().resolve_path_by_digest("d1").is_none());
        assert_eq!(session.state().aggregates().total_lines, 8);
        assert!(!session.is_rolling());
        assert_eq!(page.widget().counter(), "0");
    }

    #[test]
    fn click_toggles_and_rolls_counter() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();

        let record = controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        assert_eq!(record.path, "a.txt");
        assert!(record.viewed);
        assert!(controller.session().unwrap().is_rolling());
        assert_eq!(page.widget().shown_viewed, 8);
        assert_eq!(
            page.widget().tooltip,
            "Lines viewed: 8 / 8\n+7 / +7 additions\n-1 / -1 deletions"
        );

        // Everything viewed: both arcs drawn up to the cap adjustment.
        assert!(page.widget().ring.green < CIRCUMFERENCE);
        assert!(page.widget().ring.red < CIRCUMFERENCE);

        run_frames(&mut controller, &mut page);
        assert_eq!(page.widget().counter(), "8");
        assert!(!controller.session().unwrap().is_rolling());
    }

    #[test]
    fn click_round_trip_restores_counts() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();
        let initial_ring = page.widget().ring;

        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        run_frames(&mut controller, &mut page);
        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        run_frames(&mut controller, &mut page);

        let totals = controller.session().unwrap().state().aggregates();
        assert_eq!(totals.viewed_lines, 3);
        assert_eq!(page.widget().counter(), "3");
        assert_eq!(page.widget().ring, initial_ring);
    }

    #[test]
    fn unknown_click_changes_nothing() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();
        let before = controller.session().unwrap().state().aggregates();

        for id in ["diff-missing", "sidebar", "diff-"] {
            assert_eq!(
                controller.handle_viewed_click(&mut page, id),
                Err(IndicatorError::UnknownFileReference(id.to_string()))
            );
        }
        assert_eq!(controller.session().unwrap().state().aggregates(), before);
        assert!(page.patches.is_empty());
    }

    #[test]
    fn click_before_mount_is_unknown() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        assert!(controller.handle_viewed_click(&mut page, "diff-d1").is_err());
    }

    #[test]
    fn new_click_cancels_running_roll() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();

        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        let first = page.pending.unwrap();
        controller.handle_viewed_click(&mut page, "diff-d2").unwrap();

        assert_eq!(page.cancelled, vec![first]);
        assert_ne!(page.pending, Some(first));

        // The stale callback is ignored.
        let now = page.clock;
        controller.on_frame(&mut page, first, now);
        assert!(controller.session().unwrap().is_rolling());

        run_frames(&mut controller, &mut page);
        assert_eq!(page.widget().counter(), "5");
    }

    #[test]
    fn roll_settles_after_duration() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();
        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();

        let frame = page.pending.take().unwrap();
        page.advance(ROLL_DURATION);
        let now = page.clock;
        controller.on_frame(&mut page, frame, now);

        assert_eq!(page.widget().counter(), "8");
        assert!(page.pending.is_none());
        assert!(!controller.session().unwrap().is_rolling());
    }

    #[test]
    fn zero_line_toggle_schedules_no_frame() {
        let mut page = FakePage::new(vec![page_script(&[
            ("a.txt", "d1", 4, 0, false),
            ("empty.txt", "d0", 0, 0, false),
        ])]);
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();

        controller.handle_viewed_click(&mut page, "diff-d0").unwrap();
        assert!(page.pending.is_none());
        assert!(!controller.session().unwrap().is_rolling());
    }

    #[test]
    fn mode_change_rebuilds_in_place() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::new(DisplayMode::Split, CapStyle::Round);
        controller.rescan(&mut page).unwrap();
        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        let frame = page.pending.unwrap();

        controller.handle_message(
            &mut page,
            &ModeMessage {
                split_colors: Some(false),
            },
        );

        assert_eq!(controller.mode(), DisplayMode::Unified);
        assert_eq!(page.mounts, 1);
        assert!(page.cancelled.contains(&frame));
        let widget = page.widget();
        assert_eq!(widget.mode, DisplayMode::Unified);
        assert_eq!(widget.counter(), "8");
        assert_eq!(widget.tooltip, "Lines viewed: 8 / 8");
        assert_eq!(widget.ring.red, CIRCUMFERENCE);
    }

    #[test]
    fn message_without_flag_is_ignored() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();

        controller.handle_message(&mut page, &ModeMessage { split_colors: None });
        assert_eq!(controller.mode(), DisplayMode::Split);
        assert!(page.patches.is_empty());
    }

    #[test]
    fn mode_change_before_mount_applies_on_mount() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::default();
        controller.set_display_mode(&mut page, DisplayMode::Unified);
        assert!(page.patches.is_empty());

        controller.rescan(&mut page).unwrap();
        assert_eq!(page.widget().mode, DisplayMode::Unified);
    }

    #[test]
    fn silent_handlers_swallow_errors() {
        let mut page = FakePage::new(Vec::new());
        let mut controller = IndicatorController::default();
        controller.on_page_mutation(&mut page);
        controller.on_viewed_click(&mut page, "diff-d1");
        assert!(!controller.is_mounted());
    }

    #[test]
    fn mount_copies_host_divider_class() {
        let mut page = two_file_page();
        page.divider = Some("toolbar-divider".to_string());
        let mut controller = IndicatorController::default();
        controller.rescan(&mut page).unwrap();
        assert_eq!(page.mounted_divider.as_deref(), Some("toolbar-divider"));

        // A host without a styled divider gets a plain one.
        let mut bare = two_file_page();
        let mut controller = IndicatorController::default();
        controller.rescan(&mut bare).unwrap();
        assert_eq!(bare.mounts, 1);
        assert_eq!(bare.mounted_divider, None);
    }

    #[test]
    fn oversized_counts_mount_without_panicking() {
        let body = serde_json::json!({"payload": {"pullRequestsChangesRoute": {"diffSummaries": [
            {"path": "a.bin", "pathDigest": "d1", "linesAdded": u64::MAX, "linesDeleted": 0,
             "linesChanged": u64::MAX, "markedAsViewed": true},
            {"path": "b.bin", "pathDigest": "d2", "linesAdded": u64::MAX, "linesDeleted": 1}
        ]}}})
        .to_string();
        let mut page = FakePage::new(vec![body]);
        let mut controller = IndicatorController::default();

        controller.on_page_mutation(&mut page);
        assert!(controller.is_mounted());
        assert_eq!(page.widget().total_lines, u64::MAX);

        controller.on_viewed_click(&mut page, "diff-d2");
        run_frames(&mut controller, &mut page);
        assert_eq!(
            controller.session().unwrap().state().aggregates().viewed_lines,
            u64::MAX
        );
    }

    #[test]
    fn session_tracks_counter_target() {
        let mut page = two_file_page();
        let mut controller = IndicatorController::new(DisplayMode::Split, CapStyle::Butt);
        controller.rescan(&mut page).unwrap();
        assert_eq!(controller.cap(), CapStyle::Butt);
        assert_eq!(page.widget().cap, CapStyle::Butt);
        assert_eq!(controller.session().unwrap().shown_viewed(), 3);

        controller.handle_viewed_click(&mut page, "diff-d1").unwrap();
        // Target moves immediately even though the digits are still rolling.
        assert_eq!(controller.session().unwrap().shown_viewed(), 8);
        assert!(controller.session().unwrap().is_rolling());
    }
}
