//! Fire-and-forget command dispatch to the engine.
//!
//! One method per remote-controllable action. Each call serializes its
//! arguments in the exact positional order the engine expects and sends
//! a single datagram. There is no acknowledgment and no return value:
//! the engine is authoritative over scheduling (commands may be
//! quantized and deferred), so the only way to observe an effect is the
//! next matching state push. Send failures are logged and never retried
//! here - the next heartbeat or user action retries naturally.
//!
//! Range clamping (speed, BPM, lookback) is the caller's concern; the
//! dispatcher forwards values untouched.

use rosc::OscType;

use crate::osc::OscClient;
use crate::state::Quantize;

/// Stateless translator from control intents to outbound OSC messages.
///
/// Cloning shares the underlying socket; methods may be called from any
/// thread.
#[derive(Clone, Debug)]
pub struct CommandDispatcher {
    osc: OscClient,
}

impl CommandDispatcher {
    /// Wrap an OSC sender targeting the engine's control port.
    pub fn new(osc: OscClient) -> Self {
        Self { osc }
    }

    fn send(&self, addr: &str, args: Vec<OscType>) {
        if let Err(e) = self.osc.send_msg(addr, args) {
            log::warn!("send {addr} failed: {e}");
        }
    }

    fn quantize_arg(quantize: Option<Quantize>, default: Quantize) -> OscType {
        OscType::Int(quantize.unwrap_or(default).as_i32())
    }

    // -- Subscription ------------------------------------------------------

    /// Register `host:listen_port` as a state-push listener.
    pub fn subscribe(&self, host: &str, listen_port: u16) {
        self.send(
            "/retro/client/subscribe",
            vec![
                OscType::String(host.to_string()),
                OscType::Int(listen_port as i32),
            ],
        );
    }

    /// Deregister a state-push listener.
    pub fn unsubscribe(&self, host: &str, listen_port: u16) {
        self.send(
            "/retro/client/unsubscribe",
            vec![
                OscType::String(host.to_string()),
                OscType::Int(listen_port as i32),
            ],
        );
    }

    // -- Loop commands -----------------------------------------------------

    /// Capture audio from the engine's ring buffer into a loop.
    ///
    /// `lookback_bars` of 0 uses the engine's current lookback setting.
    /// Quantize defaults to [`Quantize::Bar`].
    pub fn capture(&self, loop_index: i32, quantize: Option<Quantize>, lookback_bars: i32) {
        self.send(
            "/retro/loop/capture",
            vec![
                OscType::Int(loop_index),
                Self::quantize_arg(quantize, Quantize::Bar),
                OscType::Int(lookback_bars),
            ],
        );
    }

    /// Start classic recording on a loop.
    pub fn record(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/record", loop_index, quantize);
    }

    /// Stop classic recording on a loop.
    pub fn stop_record(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/stop_record", loop_index, quantize);
    }

    /// Mute a loop.
    pub fn mute(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/mute", loop_index, quantize);
    }

    /// Unmute a loop.
    pub fn unmute(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/unmute", loop_index, quantize);
    }

    /// Toggle mute on a loop.
    pub fn toggle_mute(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/toggle_mute", loop_index, quantize);
    }

    /// Toggle reverse playback on a loop.
    pub fn reverse(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/reverse", loop_index, quantize);
    }

    /// Start overdubbing on a loop.
    pub fn overdub_start(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/overdub/start", loop_index, quantize);
    }

    /// Stop overdubbing on a loop.
    pub fn overdub_stop(&self, loop_index: i32, quantize: Option<Quantize>) {
        self.loop_with_quantize("/retro/loop/overdub/stop", loop_index, quantize);
    }

    /// Undo the most recent overdub layer on a loop.
    pub fn undo(&self, loop_index: i32) {
        self.send("/retro/loop/undo", vec![OscType::Int(loop_index)]);
    }

    /// Redo the most recently undone layer on a loop.
    pub fn redo(&self, loop_index: i32) {
        self.send("/retro/loop/redo", vec![OscType::Int(loop_index)]);
    }

    /// Set playback speed for a loop. Quantize defaults to
    /// [`Quantize::Free`] - speed changes are usually wanted now.
    pub fn set_speed(&self, loop_index: i32, speed: f32, quantize: Option<Quantize>) {
        self.send(
            "/retro/loop/speed",
            vec![
                OscType::Int(loop_index),
                OscType::Float(speed),
                Self::quantize_arg(quantize, Quantize::Free),
            ],
        );
    }

    /// Clear a loop, deleting all its audio.
    pub fn clear(&self, loop_index: i32) {
        self.send("/retro/loop/clear", vec![OscType::Int(loop_index)]);
    }

    // -- Global commands ---------------------------------------------------

    /// Set the metronome tempo.
    pub fn set_bpm(&self, bpm: f32) {
        self.send("/retro/metronome/bpm", vec![OscType::Float(bpm)]);
    }

    /// Enable or disable the metronome click.
    pub fn set_click(&self, enabled: bool) {
        self.send(
            "/retro/metronome/click",
            vec![OscType::Int(enabled as i32)],
        );
    }

    /// Set the engine's default quantize mode.
    pub fn set_quantize(&self, quantize: Quantize) {
        self.send(
            "/retro/settings/quantize",
            vec![OscType::Int(quantize.as_i32())],
        );
    }

    /// Set the number of lookback bars used by capture.
    pub fn set_lookback_bars(&self, bars: i32) {
        self.send("/retro/settings/lookback_bars", vec![OscType::Int(bars)]);
    }

    /// Enable or disable MIDI clock sync on the engine.
    pub fn set_midi_sync(&self, enabled: bool) {
        self.send(
            "/retro/settings/midi_sync",
            vec![OscType::Int(enabled as i32)],
        );
    }

    /// Cancel all pending (queued) operations.
    pub fn cancel_pending(&self) {
        self.send("/retro/cancel_pending", vec![]);
    }

    fn loop_with_quantize(&self, addr: &str, loop_index: i32, quantize: Option<Quantize>) {
        self.send(
            addr,
            vec![
                OscType::Int(loop_index),
                Self::quantize_arg(quantize, Quantize::Bar),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscMessage, OscPacket};
    use std::net::UdpSocket;
    use std::time::Duration;

    struct Harness {
        target: UdpSocket,
        dispatcher: CommandDispatcher,
    }

    impl Harness {
        fn new() -> Self {
            let target = UdpSocket::bind("127.0.0.1:0").unwrap();
            target
                .set_read_timeout(Some(Duration::from_secs(2)))
                .unwrap();
            let addr = target.local_addr().unwrap();
            let osc = OscClient::new(addr.to_string()).unwrap();
            Self {
                target,
                dispatcher: CommandDispatcher::new(osc),
            }
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
    fn test_capture_encoding() {
        let h = Harness::new();
        h.dispatcher.capture(2, Some(Quantize::Beat), 4);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/loop/capture");
        assert_eq!(
            msg.args,
            vec![OscType::Int(2), OscType::Int(1), OscType::Int(4)]
        );
    }

    #[test]
    fn test_capture_default_quantize_is_bar() {
        let h = Harness::new();
        h.dispatcher.capture(0, None, 0);
        let msg = h.recv();
        assert_eq!(
            msg.args,
            vec![OscType::Int(0), OscType::Int(2), OscType::Int(0)]
        );
    }

    #[test]
    fn test_two_arg_loop_commands() {
        let h = Harness::new();
        let cases: Vec<(&str, Box<dyn Fn(&CommandDispatcher)>)> = vec![
            ("/retro/loop/record", Box::new(|d| d.record(3, None))),
            ("/retro/loop/stop_record", Box::new(|d| d.stop_record(3, None))),
            ("/retro/loop/mute", Box::new(|d| d.mute(3, None))),
            ("/retro/loop/unmute", Box::new(|d| d.unmute(3, None))),
            ("/retro/loop/toggle_mute", Box::new(|d| d.toggle_mute(3, None))),
            ("/retro/loop/reverse", Box::new(|d| d.reverse(3, None))),
            ("/retro/loop/overdub/start", Box::new(|d| d.overdub_start(3, None))),
            ("/retro/loop/overdub/stop", Box::new(|d| d.overdub_stop(3, None))),
        ];
        for (addr, call) in cases {
            call(&h.dispatcher);
            let msg = h.recv();
            assert_eq!(msg.addr, addr);
            assert_eq!(msg.args, vec![OscType::Int(3), OscType::Int(2)], "{addr}");
        }
    }

    #[test]
    fn test_one_arg_loop_commands() {
        let h = Harness::new();
        let cases: Vec<(&str, Box<dyn Fn(&CommandDispatcher)>)> = vec![
            ("/retro/loop/undo", Box::new(|d| d.undo(1))),
            ("/retro/loop/redo", Box::new(|d| d.redo(1))),
            ("/retro/loop/clear", Box::new(|d| d.clear(1))),
        ];
        for (addr, call) in cases {
            call(&h.dispatcher);
            let msg = h.recv();
            assert_eq!(msg.addr, addr);
            assert_eq!(msg.args, vec![OscType::Int(1)], "{addr}");
        }
    }

    #[test]
    fn test_set_speed_default_quantize_is_free() {
        let h = Harness::new();
        h.dispatcher.set_speed(4, 2.0, None);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/loop/speed");
        assert_eq!(
            msg.args,
            vec![OscType::Int(4), OscType::Float(2.0), OscType::Int(0)]
        );
    }

    #[test]
    fn test_set_speed_explicit_quantize() {
        let h = Harness::new();
        h.dispatcher.set_speed(0, 0.5, Some(Quantize::Bar));
        let msg = h.recv();
        assert_eq!(
            msg.args,
            vec![OscType::Int(0), OscType::Float(0.5), OscType::Int(2)]
        );
    }

    #[test]
    fn test_global_commands() {
        let h = Harness::new();

        h.dispatcher.set_bpm(135.5);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/metronome/bpm");
        assert_eq!(msg.args, vec![OscType::Float(135.5)]);

        h.dispatcher.set_click(false);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/metronome/click");
        assert_eq!(msg.args, vec![OscType::Int(0)]);

        h.dispatcher.set_quantize(Quantize::Free);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/settings/quantize");
        assert_eq!(msg.args, vec![OscType::Int(0)]);

        h.dispatcher.set_lookback_bars(4);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/settings/lookback_bars");
        assert_eq!(msg.args, vec![OscType::Int(4)]);

        h.dispatcher.set_midi_sync(true);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/settings/midi_sync");
        assert_eq!(msg.args, vec![OscType::Int(1)]);

        h.dispatcher.cancel_pending();
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/cancel_pending");
        assert!(msg.args.is_empty());
    }

    #[test]
    fn test_subscription_messages() {
        let h = Harness::new();

        h.dispatcher.subscribe("localhost", 9000);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/client/subscribe");
        assert_eq!(
            msg.args,
            vec![OscType::String("localhost".into()), OscType::Int(9000)]
        );

        h.dispatcher.unsubscribe("localhost", 9000);
        let msg = h.recv();
        assert_eq!(msg.addr, "/retro/client/unsubscribe");
        assert_eq!(
            msg.args,
            vec![OscType::String("localhost".into()), OscType::Int(9000)]
        );
    }
}
