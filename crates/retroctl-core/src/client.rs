//! The looper client: listener, heartbeat and lifecycle.
//!
//! [`LooperClient`] ties the pieces together: it binds the push-listen
//! socket, runs the listener thread (datagram -> [`EnginePush`] ->
//! mirror mutation -> observers), keeps the subscription alive with a
//! heartbeat thread, and tears everything down on [`stop`].
//!
//! [`stop`]: LooperClient::stop

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rosc::OscPacket;

use crate::commands::CommandDispatcher;
use crate::config::ClientConfig;
use crate::osc::OscClient;
use crate::push::EnginePush;
use crate::state::{EngineSnapshot, StateMirror};

/// How often the listener wakes from `recv_from` to recheck the running
/// flag.
const LISTEN_POLL: Duration = Duration::from_millis(200);

/// Callback invoked with the latest snapshot after each state mutation.
pub type StateObserver = Box<dyn Fn(&EngineSnapshot) + Send + Sync>;

/// Callback invoked with each server log message.
pub type LogObserver = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Observers {
    on_state: Mutex<Option<StateObserver>>,
    on_log: Mutex<Option<LogObserver>>,
}

/// OSC client for controlling a Retrospect looper engine.
///
/// ```no_run
/// use retroctl_core::{ClientConfig, LooperClient};
///
/// let mut client = LooperClient::connect(ClientConfig::default())?;
/// client.start()?;
/// client.dispatcher().capture(0, None, 0);
/// let state = client.mirror().snapshot();
/// println!("{:.1} BPM", state.metronome.bpm);
/// client.stop();
/// # anyhow::Ok(())
/// ```
pub struct LooperClient {
    config: ClientConfig,
    mirror: StateMirror,
    dispatcher: CommandDispatcher,
    listen_sock: Arc<UdpSocket>,
    listen_port: u16,
    running: Arc<AtomicBool>,
    observers: Arc<Observers>,
    listener: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    heartbeat_stop: Option<Sender<()>>,
}

impl LooperClient {
    /// Bind sockets and prepare a client. No messages are sent until
    /// [`start`](Self::start).
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let osc = OscClient::new(config.engine_addr())
            .with_context(|| format!("binding send socket for {}", config.engine_addr()))?;
        let listen_sock = UdpSocket::bind(("0.0.0.0", config.listen_port))
            .with_context(|| format!("binding listen port {}", config.listen_port))?;
        listen_sock.set_read_timeout(Some(LISTEN_POLL))?;
        let listen_port = listen_sock.local_addr()?.port();

        Ok(Self {
            config,
            mirror: StateMirror::new(),
            dispatcher: CommandDispatcher::new(osc),
            listen_sock: Arc::new(listen_sock),
            listen_port,
            running: Arc::new(AtomicBool::new(false)),
            observers: Arc::new(Observers::default()),
            listener: None,
            heartbeat: None,
            heartbeat_stop: None,
        })
    }

    /// The replicated engine state.
    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    /// The outbound command surface.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// The local port state pushes arrive on.
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Register a callback invoked with the latest snapshot after each
    /// state push. Runs on the listener thread; must not block.
    pub fn on_state_update(&self, callback: impl Fn(&EngineSnapshot) + Send + Sync + 'static) {
        *self.observers.on_state.lock().expect("observer lock poisoned") =
            Some(Box::new(callback));
    }

    /// Register a callback invoked for each server log message. Runs on
    /// the listener thread; must not block.
    pub fn on_log(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.observers.on_log.lock().expect("observer lock poisoned") =
            Some(Box::new(callback));
    }

    /// Start receiving state pushes.
    ///
    /// Spawns the listener, sends one synchronous subscribe, waits the
    /// settle delay so the first full-state push can arrive, then
    /// starts the heartbeat.
    pub fn start(&mut self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("client already started");
        }

        let listener = {
            let sock = Arc::clone(&self.listen_sock);
            let mirror = self.mirror.clone();
            let observers = Arc::clone(&self.observers);
            let running = Arc::clone(&self.running);
            std::thread::Builder::new()
                .name("retro-listener".into())
                .spawn(move || listener_loop(&sock, &mirror, &observers, &running))
                .context("spawning listener thread")?
        };
        self.listener = Some(listener);

        self.dispatcher
            .subscribe(&self.config.advertise_host, self.listen_port);
        log::info!(
            "subscribed to {} (listening on port {})",
            self.config.engine_addr(),
            self.listen_port
        );
        std::thread::sleep(self.config.settle_delay);

        let (stop_tx, stop_rx) = bounded(1);
        let heartbeat = {
            let dispatcher = self.dispatcher.clone();
            let running = Arc::clone(&self.running);
            let host = self.config.advertise_host.clone();
            let port = self.listen_port;
            let interval = self.config.heartbeat_interval;
            std::thread::Builder::new()
                .name("retro-heartbeat".into())
                .spawn(move || heartbeat_loop(&dispatcher, &running, &host, port, interval, &stop_rx))
                .context("spawning heartbeat thread")?
        };
        self.heartbeat = Some(heartbeat);
        self.heartbeat_stop = Some(stop_tx);

        Ok(())
    }

    /// Unsubscribe and stop the listener. Idempotent; in-flight sends
    /// are neither awaited nor cancelled.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        // Stop the heartbeat first so no subscribe can race the
        // unsubscribe below.
        if let Some(stop) = self.heartbeat_stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.join();
        }

        self.dispatcher
            .unsubscribe(&self.config.advertise_host, self.listen_port);

        if let Some(handle) = self.listener.take() {
            let _ = handle.join();
        }
        log::info!("unsubscribed from {}", self.config.engine_addr());
    }
}

impl Drop for LooperClient {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LooperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LooperClient")
            .field("engine", &self.config.engine_addr())
            .field("listen_port", &self.listen_port)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Receive datagrams until the running flag drops.
///
/// A malformed datagram is a protocol violation by a trusted peer: it
/// is logged and skipped, and the loop keeps processing.
fn listener_loop(
    sock: &UdpSocket,
    mirror: &StateMirror,
    observers: &Observers,
    running: &AtomicBool,
) {
    let mut buf = [0u8; 65536];
    while running.load(Ordering::SeqCst) {
        match sock.recv_from(&mut buf) {
            Ok((size, _)) => match rosc::decoder::decode_udp(&buf[..size]) {
                Ok((_, packet)) => handle_packet(&packet, mirror, observers),
                Err(e) => log::warn!("undecodable datagram ({size} bytes): {e}"),
            },
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Read timeout; loop around to recheck the running flag.
            }
            Err(e) => log::warn!("listen socket error: {e}"),
        }
    }
}

/// Flatten bundles and apply each contained message.
fn handle_packet(packet: &OscPacket, mirror: &StateMirror, observers: &Observers) {
    match packet {
        OscPacket::Message(msg) => match EnginePush::decode(msg) {
            Ok(push) => apply_push(push, mirror, observers),
            Err(e) => log::warn!("protocol violation: {e}"),
        },
        OscPacket::Bundle(bundle) => {
            for inner in &bundle.content {
                handle_packet(inner, mirror, observers);
            }
        }
    }
}

fn apply_push(push: EnginePush, mirror: &StateMirror, observers: &Observers) {
    let mut log_text = None;
    match push {
        EnginePush::Metronome(m) => mirror.apply_metronome(m),
        EnginePush::Loop { index, info } => mirror.apply_loop(index, info),
        EnginePush::Recording { active, loop_index } => {
            mirror.apply_recording(active, loop_index)
        }
        EnginePush::Settings(s) => mirror.apply_settings(s),
        EnginePush::PendingClear => mirror.clear_pending(),
        EnginePush::PendingOp(op) => mirror.append_pending(op),
        EnginePush::Log(text) => {
            mirror.append_message(text.clone());
            log_text = Some(text);
        }
    }

    if let Some(cb) = observers
        .on_state
        .lock()
        .expect("observer lock poisoned")
        .as_ref()
    {
        let snapshot = mirror.snapshot();
        cb(&snapshot);
    }
    if let Some(text) = log_text {
        if let Some(cb) = observers
            .on_log
            .lock()
            .expect("observer lock poisoned")
            .as_ref()
        {
            cb(&text);
        }
    }
}

/// Re-subscribe every `interval` until stopped.
///
/// The wait is a channel receive so `stop()` can interrupt it; the
/// running flag is rechecked on both sides of each wait. Send failures
/// are already logged by the dispatcher and the loop keeps ticking -
/// the next tick is the retry.
fn heartbeat_loop(
    dispatcher: &CommandDispatcher,
    running: &AtomicBool,
    host: &str,
    port: u16,
    interval: Duration,
    stop: &Receiver<()>,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        match stop.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }
        dispatcher.subscribe(host, port);
        log::debug!("heartbeat re-subscribe sent");
    }
}
