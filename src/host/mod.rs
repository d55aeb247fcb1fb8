//! The page the indicator lives on, as seen by the controller.

use crate::widget::{Widget, WidgetPatch};
use std::time::Instant;

/// Prefix of the per-file diff container id; the rest is the path digest.
pub const DIFF_CONTAINER_PREFIX: &str = "diff-";

/// Handle for a scheduled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Capabilities the controller needs from the host page.
///
/// Locators return `None` when the page has not rendered the element yet;
/// the controller treats that as "try again on the next rescan".
pub trait PageHost {
    /// Opaque handle to the toolbar the widget is mounted after.
    type Anchor;

    /// Bodies of the page's embedded JSON scripts.
    fn json_scripts(&self) -> Vec<String>;

    fn toolbar_anchor(&self) -> Option<Self::Anchor>;

    /// Class of the host's own toolbar divider, copied onto ours.
    fn divider_class(&self) -> Option<String>;

    /// Whether an element with [`crate::widget::WIDGET_ID`] is on the page.
    fn widget_present(&self) -> bool;

    /// Insert a divider and the widget right after `anchor`.
    fn mount(&mut self, anchor: &Self::Anchor, divider_class: Option<&str>, widget: &Widget);

    /// Apply an update to the mounted widget.
    fn apply(&mut self, patch: WidgetPatch);

    /// Current time on the host's animation clock.
    fn now(&self) -> Instant;

    /// Ask for a callback on the next animation frame.
    fn request_frame(&mut self) -> FrameId;

    fn cancel_frame(&mut self, frame: FrameId);
}

/// Extract the path digest from a diff container id such as `diff-abc123`.
pub fn digest_from_container_id(id: &str) -> Option<&str> {
    id.strip_prefix(DIFF_CONTAINER_PREFIX)
        .filter(|digest| !digest.is_empty())
}

/// Container id for a file digest.
pub fn container_id(digest: &str) -> String {
    format!("{DIFF_CONTAINER_PREFIX}{digest}")
}

/// A page held entirely in memory.
///
/// Used by the command line and the terminal preview. The toolbar is always
/// present; frames are handed out one at a time and collected by the caller's
/// event loop via [`MemoryPage::take_frame`].
#[derive(Debug, Default)]
pub struct MemoryPage {
    scripts: Vec<String>,
    divider_class: Option<String>,
    /// Class given to the divider inserted with the widget.
    mounted_divider: Option<String>,
    widget: Option<Widget>,
    pending_frame: Option<FrameId>,
    frames_issued: u64,
}

impl MemoryPage {
    pub fn new(scripts: Vec<String>) -> Self {
        Self {
            scripts,
            ..Self::default()
        }
    }

    pub fn with_divider_class(mut self, class: impl Into<String>) -> Self {
        self.divider_class = Some(class.into());
        self
    }

    pub fn widget(&self) -> Option<&Widget> {
        self.widget.as_ref()
    }

    /// Class of the divider mounted alongside the widget.
    pub fn mounted_divider(&self) -> Option<&str> {
        self.mounted_divider.as_deref()
    }

    /// Drop the widget, as a re-render of the host page would.
    pub fn remove_widget(&mut self) {
        self.widget = None;
        self.mounted_divider = None;
    }

    pub fn take_frame(&mut self) -> Option<FrameId> {
        self.pending_frame.take()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }
}

impl PageHost for MemoryPage {
    type Anchor = ();

    fn json_scripts(&self) -> Vec<String> {
        self.scripts.clone()
    }

    fn toolbar_anchor(&self) -> Option<()> {
        Some(())
    }

    fn divider_class(&self) -> Option<String> {
        self.divider_class.clone()
    }

    fn widget_present(&self) -> bool {
        self.widget.is_some()
    }

    fn mount(&mut self, _anchor: &(), divider_class: Option<&str>, widget: &Widget) {
        self.mounted_divider = divider_class.map(str::to_string);
        self.widget = Some(widget.clone());
    }

    fn apply(&mut self, patch: WidgetPatch) {
        if let Some(widget) = self.widget.as_mut() {
            widget.apply(patch);
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn request_frame(&mut self) -> FrameId {
        self.frames_issued += 1;
        let frame = FrameId(self.frames_issued);
        self.pending_frame = Some(frame);
        frame
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        if self.pending_frame == Some(frame) {
            self.pending_frame = None;
        }
    }
}
