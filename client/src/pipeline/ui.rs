//! Boundary to the UI collaborator
//!
//! The pipeline never touches UI objects directly. It posts [`UiEvent`]s on a
//! channel and the UI drains them on whatever thread it requires.

use tokio::sync::mpsc;
use tracing::debug;

use crate::render::RenderedImage;

/// A single call on the UI collaborator surface
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Show or hide the busy indicator
    Busy(bool),
    /// Enable or disable the controls that start a run
    ControlsEnabled(bool),
    /// Show the annotated image
    DisplayImage(RenderedImage),
    /// Show a human-readable failure message
    DisplayError(String),
}

/// Sending half of the UI event channel
#[derive(Debug, Clone)]
pub struct UiHandle {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl UiHandle {
    /// Create a handle together with the receiver the UI drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn report_busy(&self, busy: bool) {
        self.send(UiEvent::Busy(busy));
    }

    pub fn set_controls_enabled(&self, enabled: bool) {
        self.send(UiEvent::ControlsEnabled(enabled));
    }

    pub fn display_image(&self, image: RenderedImage) {
        self.send(UiEvent::DisplayImage(image));
    }

    pub fn display_error(&self, message: String) {
        self.send(UiEvent::DisplayError(message));
    }

    fn send(&self, event: UiEvent) {
        // A closed receiver means the UI is gone; nothing left to notify
        if self.sender.send(event).is_err() {
            debug!("UI channel closed, dropping event");
        }
    }
}

/// Keeps the UI in the busy state for the lifetime of one invocation
///
/// Dropping the guard without calling [`BusyGuard::finish`] restores the
/// indicator and controls, which covers panics and cancelled tasks.
pub(crate) struct BusyGuard {
    ui: UiHandle,
    armed: bool,
}

impl BusyGuard {
    pub(crate) fn engage(ui: &UiHandle) -> Self {
        ui.report_busy(true);
        ui.set_controls_enabled(false);
        Self {
            ui: ui.clone(),
            armed: true,
        }
    }

    /// Hand the terminal outcome to the UI and release it
    pub(crate) fn finish(mut self, outcome: UiEvent) {
        self.armed = false;
        self.ui.report_busy(false);
        match outcome {
            UiEvent::DisplayImage(image) => self.ui.display_image(image),
            UiEvent::DisplayError(message) => self.ui.display_error(message),
            other => self.ui.send(other),
        }
        self.ui.set_controls_enabled(true);
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.armed {
            self.ui.report_busy(false);
            self.ui.set_controls_enabled(true);
        }
    }
}
