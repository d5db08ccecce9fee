//! Terminal UI for retroctl
//!
//! Provides a live view of the mirrored engine state using ratatui.

pub mod app;
pub mod layout;
pub mod logger;
pub mod ui;

pub use app::TuiApp;
pub use logger::{init_logger, init_tui_logger};

use crossbeam_channel::{Receiver, Sender};
use std::sync::Mutex;

/// Event types that can be sent to the TUI
#[derive(Clone, Debug)]
pub enum TuiEvent {
    /// A log message to display
    Log { level: log::Level, message: String },
}

/// Shared TUI event sender
static TUI_EVENT_SENDER: Mutex<Option<Sender<TuiEvent>>> = Mutex::new(None);

/// Initialize the TUI event channel
pub fn init_tui_channel() -> Receiver<TuiEvent> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    *TUI_EVENT_SENDER.lock().unwrap() = Some(sender);
    receiver
}

/// Send a TUI event
pub fn send_tui_event(event: TuiEvent) {
    if let Some(sender) = TUI_EVENT_SENDER.lock().unwrap().as_ref() {
        let _ = sender.send(event);
    }
}
