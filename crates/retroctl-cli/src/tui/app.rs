//! TUI application state and key handling

use crate::tui::TuiEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::Level;
use retroctl_core::{CommandDispatcher, EngineSnapshot};
use std::collections::VecDeque;

const MAX_LOG_ENTRIES: usize = 100;

/// Speed multiplier bounds accepted by the engine.
const MIN_SPEED: f64 = 0.25;
const MAX_SPEED: f64 = 4.0;

/// BPM floor when nudging the tempo down.
const MIN_BPM: f64 = 30.0;

/// Lookback bounds for the capture setting.
const MIN_LOOKBACK: i32 = 1;
const MAX_LOOKBACK: i32 = 8;

/// What the main loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// One entry in the TUI log panel.
pub struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

/// Main TUI application state.
///
/// Holds the render-side copy of the mirror snapshot plus purely local
/// UI state (selection, log buffer, modals). Key handling translates
/// keystrokes into dispatcher calls; relative commands (speed, BPM,
/// lookback) are computed from the cached snapshot, and clamping
/// happens here - the dispatcher forwards values untouched.
pub struct TuiApp {
    /// Cached snapshot for rendering and relative commands.
    pub state: EngineSnapshot,
    /// Loop the keyboard commands target (0-based).
    pub selected_loop: usize,
    /// Log messages buffer
    pub log_buffer: VecDeque<LogEntry>,
    /// Show help modal
    pub show_help_modal: bool,
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiApp {
    pub fn new() -> Self {
        Self {
            state: EngineSnapshot::new(),
            selected_loop: 0,
            log_buffer: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            show_help_modal: false,
        }
    }

    /// Update the cached snapshot from the mirror.
    pub fn update_state(&mut self, state: EngineSnapshot) {
        self.state = state;
        if self.selected_loop >= self.state.loops.len() {
            self.selected_loop = self.state.loops.len().saturating_sub(1);
        }
    }

    /// Process a TUI event
    pub fn process_event(&mut self, event: TuiEvent) {
        match event {
            TuiEvent::Log { level, message } => self.add_log(level, message),
        }
    }

    /// Add a log message
    pub fn add_log(&mut self, level: Level, message: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        self.log_buffer.push_back(LogEntry {
            timestamp,
            level,
            message,
        });
        if self.log_buffer.len() > MAX_LOG_ENTRIES {
            self.log_buffer.pop_front();
        }
    }

    /// Toggle help modal
    pub fn toggle_help_modal(&mut self) {
        self.show_help_modal = !self.show_help_modal;
    }

    pub fn select_previous_loop(&mut self) {
        self.selected_loop = self.selected_loop.saturating_sub(1);
    }

    pub fn select_next_loop(&mut self) {
        if self.selected_loop + 1 < self.state.loops.len() {
            self.selected_loop += 1;
        }
    }

    /// Translate one key press into a dispatcher call.
    pub fn handle_key(&mut self, key: KeyEvent, dispatcher: &CommandDispatcher) -> KeyOutcome {
        let idx = self.selected_loop as i32;
        let q = Some(self.state.settings.default_quantize);

        match key.code {
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return KeyOutcome::Quit;
            }
            KeyCode::Char('?') => self.toggle_help_modal(),
            KeyCode::Esc => {
                if self.show_help_modal {
                    self.show_help_modal = false;
                } else {
                    dispatcher.cancel_pending();
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let target = c as usize - '1' as usize;
                if target < self.state.loops.len() {
                    self.selected_loop = target;
                }
            }
            KeyCode::Up => self.select_previous_loop(),
            KeyCode::Down => self.select_next_loop(),
            KeyCode::Char(' ') => dispatcher.capture(idx, q, 0),
            KeyCode::Char('r') => {
                let rec = &self.state.recording;
                if rec.active && rec.loop_index == idx {
                    dispatcher.stop_record(idx, q);
                } else {
                    dispatcher.record(idx, q);
                }
            }
            KeyCode::Char('m') => dispatcher.toggle_mute(idx, q),
            KeyCode::Char('v') => dispatcher.reverse(idx, q),
            KeyCode::Char('o') => dispatcher.overdub_start(idx, q),
            KeyCode::Char('O') => dispatcher.overdub_stop(idx, q),
            KeyCode::Char('u') => dispatcher.undo(idx),
            KeyCode::Char('U') => dispatcher.redo(idx),
            KeyCode::Char('c') => dispatcher.clear(idx),
            KeyCode::Char('[') => {
                if let Some(lp) = self.state.loops.get(self.selected_loop) {
                    let speed = (lp.speed / 2.0).max(MIN_SPEED);
                    dispatcher.set_speed(idx, speed as f32, None);
                }
            }
            KeyCode::Char(']') => {
                if let Some(lp) = self.state.loops.get(self.selected_loop) {
                    let speed = (lp.speed * 2.0).min(MAX_SPEED);
                    dispatcher.set_speed(idx, speed as f32, None);
                }
            }
            KeyCode::Char('+') => {
                dispatcher.set_bpm((self.state.metronome.bpm + 5.0) as f32);
            }
            KeyCode::Char('-') => {
                dispatcher.set_bpm((self.state.metronome.bpm - 5.0).max(MIN_BPM) as f32);
            }
            KeyCode::Tab => {
                dispatcher.set_quantize(self.state.settings.default_quantize.cycle());
            }
            KeyCode::Char('B') => {
                let bars = (self.state.settings.lookback_bars + 1).min(MAX_LOOKBACK);
                dispatcher.set_lookback_bars(bars);
            }
            KeyCode::Char('b') => {
                let bars = (self.state.settings.lookback_bars - 1).max(MIN_LOOKBACK);
                dispatcher.set_lookback_bars(bars);
            }
            KeyCode::Char('M') => {
                dispatcher.set_click(!self.state.settings.click_enabled);
            }
            KeyCode::Char('S') => {
                dispatcher.set_midi_sync(!self.state.settings.midi_sync_enabled);
            }
            _ => {}
        }
        KeyOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retroctl_core::OscClient;
    use rosc::{OscMessage, OscPacket, OscType};
    use std::net::UdpSocket;
    use std::time::Duration;

    struct Harness {
        target: UdpSocket,
        dispatcher: CommandDispatcher,
        app: TuiApp,
    }

    impl Harness {
        fn new() -> Self {
            let target = UdpSocket::bind("127.0.0.1:0").unwrap();
            target
                .set_read_timeout(Some(Duration::from_secs(2)))
                .unwrap();
            let osc = OscClient::new(target.local_addr().unwrap().to_string()).unwrap();
            Self {
                target,
                dispatcher: CommandDispatcher::new(osc),
                app: TuiApp::new(),
            }
        }

        fn press(&mut self, code: KeyCode) -> KeyOutcome {
            let key = KeyEvent::new(code, KeyModifiers::NONE);
            self.app.handle_key(key, &self.dispatcher)
        }

        fn recv(&self) -> OscMessage {
            let mut buf = [0u8; 4096];
            let (size, _) = self.target.recv_from(&mut buf).unwrap();
            let (_, packet) = rosc::decoder::decode_udp(&buf[..size]).unwrap();
            match packet {
                OscPacket::Message(msg) => msg,
                other => panic!("expected message, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_quit_keys() {
        let mut h = Harness::new();
        assert_eq!(h.press(KeyCode::Char('q')), KeyOutcome::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            h.app.handle_key(ctrl_c, &h.dispatcher),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn test_digit_selects_loop() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('3'));
        assert_eq!(h.app.selected_loop, 2);
        // Out of range is ignored (default snapshot has 8 loops)
        h.press(KeyCode::Char('9'));
        assert_eq!(h.app.selected_loop, 2);
    }

    #[test]
    fn test_space_captures_selected_with_engine_default_quantize() {
        let mut h = Harness::new();
        h.app.state.settings.default_quantize = retroctl_core::Quantize::Beat;
        h.press(KeyCode::Char('5'));
        h.press(KeyCode::Char(' '));
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/loop/capture");
        assert_eq!(
            msg.args,
            vec![OscType::Int(4), OscType::Int(1), OscType::Int(0)]
        );
    }

    #[test]
    fn test_record_toggles_against_recording_state() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('r'));
        assert_eq!(h.recv().addr, "/retro/loop/record");

        h.app.state.recording.active = true;
        h.app.state.recording.loop_index = 0;
        h.press(KeyCode::Char('r'));
        assert_eq!(h.recv().addr, "/retro/loop/stop_record");

        // Recording on a different loop: 'r' starts recording here
        h.app.state.recording.loop_index = 4;
        h.press(KeyCode::Char('r'));
        assert_eq!(h.recv().addr, "/retro/loop/record");
    }

    #[test]
    fn test_speed_halves_and_clamps() {
        let mut h = Harness::new();
        h.app.state.loops[0].speed = 0.5;
        h.press(KeyCode::Char('['));
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/loop/speed");
        assert_eq!(msg.args[1], OscType::Float(0.25));

        // Already at the floor: stays clamped
        h.app.state.loops[0].speed = 0.25;
        h.press(KeyCode::Char('['));
        assert_eq!(h.recv().args[1], OscType::Float(0.25));

        h.app.state.loops[0].speed = 4.0;
        h.press(KeyCode::Char(']'));
        assert_eq!(h.recv().args[1], OscType::Float(4.0));
    }

    #[test]
    fn test_bpm_nudge_has_floor() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('+'));
        assert_eq!(h.recv().args, vec![OscType::Float(125.0)]);

        h.app.state.metronome.bpm = 32.0;
        h.press(KeyCode::Char('-'));
        assert_eq!(h.recv().args, vec![OscType::Float(30.0)]);
    }

    #[test]
    fn test_tab_cycles_quantize() {
        let mut h = Harness::new();
        // Default is Bar; next in cycle is Free
        h.press(KeyCode::Tab);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/settings/quantize");
        assert_eq!(msg.args, vec![OscType::Int(0)]);
    }

    #[test]
    fn test_lookback_clamped() {
        let mut h = Harness::new();
        h.app.state.settings.lookback_bars = 8;
        h.press(KeyCode::Char('B'));
        assert_eq!(h.recv().args, vec![OscType::Int(8)]);

        h.app.state.settings.lookback_bars = 1;
        h.press(KeyCode::Char('b'));
        assert_eq!(h.recv().args, vec![OscType::Int(1)]);
    }

    #[test]
    fn test_click_and_midi_sync_toggle() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('M'));
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/metronome/click");
        assert_eq!(msg.args, vec![OscType::Int(0)]);

        h.press(KeyCode::Char('S'));
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/settings/midi_sync");
        assert_eq!(msg.args, vec![OscType::Int(1)]);
    }

    #[test]
    fn test_esc_cancels_pending_unless_help_open() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('?'));
        assert!(h.app.show_help_modal);
        h.press(KeyCode::Esc);
        assert!(!h.app.show_help_modal);

        h.press(KeyCode::Esc);
        assert_eq!(h.recv().addr, "/retro/cancel_pending");
    }

    #[test]
    fn test_log_buffer_bounded() {
        let mut h = Harness::new();
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            h.app.add_log(Level::Info, format!("entry {i}"));
        }
        assert_eq!(h.app.log_buffer.len(), MAX_LOG_ENTRIES);
        assert_eq!(h.app.log_buffer.front().unwrap().message, "entry 5");
    }

    #[test]
    fn test_selection_follows_shrinking_view() {
        let mut h = Harness::new();
        h.app.selected_loop = 7;
        let mut snap = EngineSnapshot::new();
        snap.loops.truncate(4);
        h.app.update_state(snap);
        assert_eq!(h.app.selected_loop, 3);
    }
}
