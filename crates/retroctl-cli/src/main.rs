//! retroctl - Terminal remote control for the Retrospect looper engine.
//!
//! Connects to a running engine over OSC/UDP, subscribes to its state
//! pushes and presents a live view: a full-screen TUI when attached to
//! a terminal, or a line-command prompt otherwise.
//!
//! # Architecture
//!
//! - **retroctl-core**: state mirror, push decoding, command dispatch,
//!   subscription heartbeat
//! - this binary: argument parsing, terminal mode switching, rendering
//!   and keyboard input

mod line;
mod tui;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use retroctl_core::{ClientConfig, LooperClient, DEFAULT_ENGINE_PORT};

use tui::app::KeyOutcome;

/// Frame interval for the state display (~15 Hz); doubles as the input
/// poll timeout.
const FRAME_INTERVAL: Duration = Duration::from_millis(66);

/// Remote control for the Retrospect looper
#[derive(Parser, Debug)]
#[command(name = "retroctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal remote control for the Retrospect looper engine", long_about = None)]
struct Args {
    /// Engine host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Engine OSC port
    #[arg(long, default_value_t = DEFAULT_ENGINE_PORT)]
    port: u16,

    /// Local port for receiving state pushes (0 = auto-assign)
    #[arg(long, default_value_t = 0)]
    listen_port: u16,

    /// Host the engine should push state to, as reachable from the
    /// engine's side
    #[arg(long, default_value = "localhost")]
    advertise_host: String,

    /// Use line-command mode instead of the full-screen TUI
    #[arg(long)]
    line: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let use_tui = !args.line && std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
    if use_tui {
        tui::init_tui_logger();
    } else {
        tui::init_logger();
    }

    let config = ClientConfig::new(args.host.clone(), args.port)
        .with_listen_port(args.listen_port)
        .with_advertise_host(args.advertise_host);
    let mut client = LooperClient::connect(config).context("connecting to engine")?;

    // Engine notices land in the same log panel as local messages
    client.on_log(|text| log::info!("{text}"));

    client.start().context("starting client")?;
    log::info!(
        "Connected to {}:{}, listening on port {}",
        args.host,
        args.port,
        client.listen_port()
    );

    let result = if use_tui {
        run_tui(&client)
    } else {
        line::run(&client)
    };

    client.stop();
    println!("Bye!");
    result
}

/// TUI event loop: sample the mirror, draw, handle keys.
fn run_tui(client: &LooperClient) -> Result<()> {
    use crossterm::{
        event::{self, Event},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    };
    use ratatui::{backend::CrosstermBackend, Terminal};

    let tui_receiver = tui::init_tui_channel();

    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = tui::TuiApp::new();

    let result = loop {
        // Drain queued log events
        while let Ok(tui_event) = tui_receiver.try_recv() {
            app.process_event(tui_event);
        }

        app.update_state(client.mirror().snapshot());

        if let Err(e) = terminal.draw(|f| tui::ui::render_ui(f, &mut app)) {
            break Err(e.into());
        }

        match event::poll(FRAME_INTERVAL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    if app.handle_key(key, client.dispatcher()) == KeyOutcome::Quit {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
    };

    // Best-effort terminal restore; failure is logged, never blocks exit
    if let Err(e) = disable_raw_mode() {
        log::warn!("failed to disable raw mode: {e}");
    }
    if let Err(e) = execute!(terminal.backend_mut(), LeaveAlternateScreen) {
        log::warn!("failed to leave alternate screen: {e}");
    }
    if let Err(e) = terminal.show_cursor() {
        log::warn!("failed to restore cursor: {e}");
    }

    result
}
