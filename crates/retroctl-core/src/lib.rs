//! retroctl-core - Client library for remote-controlling a Retrospect
//! looper engine.
//!
//! This crate provides the state-mirroring OSC client:
//!
//! - **State** - locally replicated engine snapshot and its
//!   thread-safe mirror
//! - **Push** - typed decoding of inbound state-push messages
//! - **Commands** - fire-and-forget dispatch of control messages
//! - **Client** - listener and re-subscription heartbeat lifecycle
//! - **OSC** - UDP sender shared by commands and subscription
//!
//! # Architecture
//!
//! Inbound datagrams decode once into an [`EnginePush`] and mutate the
//! [`StateMirror`]; readers (a render loop, an input loop) take owned
//! snapshots and never hold a lock across a frame. Outbound commands
//! are fire-and-forget: the engine is authoritative over scheduling, so
//! effects are observed only via the next matching push. A heartbeat
//! re-subscribes this client every few seconds to survive engine
//! restarts and message loss.

pub mod client;
pub mod commands;
pub mod config;
pub mod osc;
pub mod push;
pub mod state;

// Re-export main types for convenience
pub use client::{LogObserver, LooperClient, StateObserver};
pub use commands::CommandDispatcher;
pub use config::{ClientConfig, DEFAULT_ENGINE_PORT, DEFAULT_HEARTBEAT_INTERVAL};
pub use osc::OscClient;
pub use push::{DecodeError, EnginePush};
pub use state::{
    EngineSettings, EngineSnapshot, LoopInfo, LoopState, MetronomeState, PendingOp, Quantize,
    RecordingState, StateMirror, DEFAULT_LOOP_COUNT,
};
