//! OSC (Open Sound Control) sender for engine communication.
//!
//! The Retrospect engine is controlled over UDP OSC. This module
//! provides the outbound half: a socket handle that the command
//! dispatcher and the subscription heartbeat share. The inbound half
//! (the push listener) lives in [`crate::client`].

use anyhow::Result;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::sync::Arc;

/// UDP-based OSC sender targeting the engine's control port.
///
/// Cloning shares the underlying socket; `send_msg` may be called
/// concurrently from multiple threads (each call is one datagram, no
/// ordering is guaranteed across callers).
#[derive(Clone)]
pub struct OscClient {
    sock: Arc<UdpSocket>,
    /// Target address in "host:port" format.
    pub addr: String,
}

impl OscClient {
    /// Create a new OSC sender targeting the given address.
    ///
    /// # Arguments
    /// * `addr` - The target address in "host:port" format (e.g., "127.0.0.1:7770")
    ///
    /// # Returns
    /// A new sender bound to an ephemeral port.
    pub fn new<A: Into<String>>(addr: A) -> Result<Self> {
        let sock = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            sock: Arc::new(sock),
            addr: addr.into(),
        })
    }

    /// Send an OSC message with the given path and arguments.
    ///
    /// # Arguments
    /// * `path` - The OSC address pattern (e.g., "/retro/loop/capture")
    /// * `args` - The message arguments, in protocol order
    pub fn send_msg(&self, path: &str, args: Vec<OscType>) -> Result<()> {
        let msg = OscMessage {
            addr: path.into(),
            args,
        };
        let buf = encoder::encode(&OscPacket::Message(msg))?;
        self.sock.send_to(&buf, &self.addr)?;
        Ok(())
    }
}

impl std::fmt::Debug for OscClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscClient")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}
