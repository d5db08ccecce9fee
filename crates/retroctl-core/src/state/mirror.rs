//! Thread-safe mirror of the remote engine state.
//!
//! The [`StateMirror`] is the exclusive owner of the locally cached
//! [`EngineSnapshot`]. It uses an RwLock so the render and input loops
//! can read concurrently while inbound push handlers write.
//!
//! Every `apply_*` call is a total overwrite of one sub-record from the
//! latest push. Pushes for distinct sub-records may arrive in any order;
//! within one sub-record the last applied message wins. There is no
//! sequence numbering, so a stale update delivered after a newer one
//! silently wins - a known staleness risk of the push protocol, not
//! something this layer detects.

use std::sync::{Arc, RwLock};

use super::model::{
    EngineSettings, EngineSnapshot, LoopInfo, MetronomeState, PendingOp, Quantize, MAX_MESSAGES,
};

/// Thread-safe owner of the replicated engine state.
///
/// Cloning is cheap and shares the underlying snapshot.
#[derive(Clone)]
pub struct StateMirror {
    state: Arc<RwLock<EngineSnapshot>>,
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMirror {
    /// Create a mirror holding the default snapshot.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineSnapshot::new())),
        }
    }

    /// Read the state with a closure, under a shared lock.
    pub fn with_state_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&EngineSnapshot) -> R,
    {
        let state = self.state.read().expect("State lock poisoned");
        f(&state)
    }

    /// Write to the state with a closure, under an exclusive lock.
    pub fn with_state_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut EngineSnapshot) -> R,
    {
        let mut state = self.state.write().expect("State lock poisoned");
        f(&mut state)
    }

    /// Owned copy of the current snapshot.
    ///
    /// Safe to read without holding any lock afterwards; a concurrent
    /// `apply_*` is either fully visible or not visible at all.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.with_state_read(|s| s.clone())
    }

    /// Replace the metronome sub-record.
    pub fn apply_metronome(&self, metronome: MetronomeState) {
        self.with_state_write(|s| s.metronome = metronome);
    }

    /// Replace one loop slot, growing the sequence with default entries
    /// if the index is beyond the current length.
    pub fn apply_loop(&self, index: usize, info: LoopInfo) {
        self.with_state_write(|s| {
            s.ensure_loop_index(index);
            s.loops[index] = info;
        });
    }

    /// Replace the recording indicator.
    pub fn apply_recording(&self, active: bool, loop_index: i32) {
        self.with_state_write(|s| {
            s.recording.active = active;
            s.recording.loop_index = loop_index;
        });
    }

    /// Replace the settings sub-record.
    pub fn apply_settings(&self, settings: EngineSettings) {
        self.with_state_write(|s| s.settings = settings);
    }

    /// Drop all pending operations. Only a full clear exists; the
    /// engine re-pushes the surviving ops afterwards.
    pub fn clear_pending(&self) {
        self.with_state_write(|s| s.pending_ops.clear());
    }

    /// Append one pending operation in arrival order.
    pub fn append_pending(&self, op: PendingOp) {
        self.with_state_write(|s| s.pending_ops.push(op));
    }

    /// Append a server log message, dropping the oldest beyond
    /// [`MAX_MESSAGES`].
    pub fn append_message(&self, text: impl Into<String>) {
        self.with_state_write(|s| {
            s.messages.push(text.into());
            if s.messages.len() > MAX_MESSAGES {
                let excess = s.messages.len() - MAX_MESSAGES;
                s.messages.drain(..excess);
            }
        });
    }

    /// Current tempo in BPM.
    pub fn bpm(&self) -> f64 {
        self.with_state_read(|s| s.metronome.bpm)
    }

    /// Engine-side default quantize mode.
    pub fn default_quantize(&self) -> Quantize {
        self.with_state_read(|s| s.settings.default_quantize)
    }

    /// Playback speed of one loop, if the index is known.
    pub fn loop_speed(&self, index: usize) -> Option<f64> {
        self.with_state_read(|s| s.loops.get(index).map(|lp| lp.speed))
    }
}

impl std::fmt::Debug for StateMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMirror")
            .field("loops", &self.with_state_read(|s| s.loops.len()))
            .finish_non_exhaustive()
    }
}
