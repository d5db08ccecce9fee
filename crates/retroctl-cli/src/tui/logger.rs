//! Custom logger that routes messages to the TUI log panel or stderr

use log::{LevelFilter, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};

static TUI_MODE: AtomicBool = AtomicBool::new(false);

/// Custom logger that routes to the TUI when enabled, otherwise to stderr
pub struct TuiLogger;

impl log::Log for TuiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if TUI_MODE.load(Ordering::Relaxed) {
            super::send_tui_event(super::TuiEvent::Log {
                level: record.level(),
                message: record.args().to_string(),
            });
        } else {
            // Plain mode writes straight to stderr so line-mode prompts
            // on stdout stay clean
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn install(tui_mode: bool) {
    TUI_MODE.store(tui_mode, Ordering::Relaxed);

    if log::set_logger(&TUI_LOGGER).is_ok() {
        // Default to Info, allow override via RUST_LOG
        let default_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);

        log::set_max_level(default_level);
    }
}

/// Initialize the logger in plain mode (logs to stderr)
pub fn init_logger() {
    install(false);
}

/// Initialize the logger in TUI mode (logs to the TUI log panel only)
pub fn init_tui_logger() {
    install(true);
}

static TUI_LOGGER: TuiLogger = TuiLogger;
