//! State model types for the engine mirror.
//!
//! These types are the client's replica of what the Retrospect engine
//! pushes over OSC: metronome transport, per-loop status, queued
//! operations, recording state and global settings. The replica is
//! eventually consistent - it is overwritten sub-record by sub-record
//! as pushes arrive and carries no versioning of its own.

/// Maximum number of server log messages retained for display.
pub const MAX_MESSAGES: usize = 64;

/// Number of loop slots a fresh snapshot starts with.
///
/// The engine may report higher indices; the snapshot grows to fit.
pub const DEFAULT_LOOP_COUNT: usize = 8;

/// Quantization mode controlling when a queued command takes effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quantize {
    /// Apply immediately.
    Free,
    /// Apply at the next beat boundary.
    Beat,
    /// Apply at the next bar boundary.
    #[default]
    Bar,
}

impl Quantize {
    /// Wire encoding (0=Free, 1=Beat, 2=Bar).
    pub fn as_i32(self) -> i32 {
        match self {
            Quantize::Free => 0,
            Quantize::Beat => 1,
            Quantize::Bar => 2,
        }
    }

    /// The next mode in Free -> Beat -> Bar -> Free order.
    pub fn cycle(self) -> Self {
        match self {
            Quantize::Free => Quantize::Beat,
            Quantize::Beat => Quantize::Bar,
            Quantize::Bar => Quantize::Free,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Quantize::Free => "Free",
            Quantize::Beat => "Beat",
            Quantize::Bar => "Bar",
        }
    }
}

impl TryFrom<i32> for Quantize {
    type Error = i32;

    fn try_from(v: i32) -> Result<Self, i32> {
        match v {
            0 => Ok(Quantize::Free),
            1 => Ok(Quantize::Beat),
            2 => Ok(Quantize::Bar),
            other => Err(other),
        }
    }
}

/// Lifecycle state of a loop slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// No audio captured.
    #[default]
    Empty,
    /// Playing back.
    Playing,
    /// Has audio but is silenced.
    Muted,
    /// Classic recording in progress.
    Recording,
}

impl LoopState {
    /// Wire encoding (0=Empty, 1=Playing, 2=Muted, 3=Recording).
    pub fn as_i32(self) -> i32 {
        match self {
            LoopState::Empty => 0,
            LoopState::Playing => 1,
            LoopState::Muted => 2,
            LoopState::Recording => 3,
        }
    }
}

impl TryFrom<i32> for LoopState {
    type Error = i32;

    fn try_from(v: i32) -> Result<Self, i32> {
        match v {
            0 => Ok(LoopState::Empty),
            1 => Ok(LoopState::Playing),
            2 => Ok(LoopState::Muted),
            3 => Ok(LoopState::Recording),
            other => Err(other),
        }
    }
}

/// Metronome transport position and tempo.
#[derive(Clone, Debug, PartialEq)]
pub struct MetronomeState {
    /// Current bar number (0-based).
    pub bar: i32,
    /// Beat index within the bar (0-based, < beats_per_bar).
    pub beat: i32,
    /// Fractional position within the current beat, [0, 1).
    pub beat_fraction: f64,
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Beats per bar.
    pub beats_per_bar: i32,
    /// Whether the transport is running.
    pub running: bool,
}

impl Default for MetronomeState {
    fn default() -> Self {
        Self {
            bar: 0,
            beat: 0,
            beat_fraction: 0.0,
            bpm: 120.0,
            beats_per_bar: 4,
            running: true,
        }
    }
}

/// Status of a single loop slot as last reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopInfo {
    /// Lifecycle state.
    pub state: LoopState,
    /// Loop length in bars.
    pub length_in_bars: f64,
    /// Total overdub layer count (including undone layers).
    pub layers: i32,
    /// Currently audible layer count (<= layers).
    pub active_layers: i32,
    /// Playback speed multiplier.
    pub speed: f64,
    /// Reverse playback flag.
    pub reversed: bool,
    /// Playback position as a fraction of loop length, [0, 1].
    pub play_position_pct: f64,
    /// Loop length in samples.
    pub length_samples: i64,
}

impl Default for LoopInfo {
    fn default() -> Self {
        Self {
            state: LoopState::Empty,
            length_in_bars: 0.0,
            layers: 0,
            active_layers: 0,
            speed: 1.0,
            reversed: false,
            play_position_pct: 0.0,
            length_samples: 0,
        }
    }
}

impl LoopInfo {
    pub fn is_empty(&self) -> bool {
        self.state == LoopState::Empty
    }

    pub fn is_playing(&self) -> bool {
        self.state == LoopState::Playing
    }

    pub fn is_muted(&self) -> bool {
        self.state == LoopState::Muted
    }

    pub fn is_recording(&self) -> bool {
        self.state == LoopState::Recording
    }
}

/// An operation the engine has accepted but deferred to a quantize
/// boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingOp {
    /// Loop the operation targets.
    pub loop_index: i32,
    /// Boundary the operation waits for.
    pub quantize: Quantize,
    /// Human-readable description from the engine (e.g. "Capture Loop").
    pub description: String,
}

/// Global engine settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Default quantize mode applied by the engine when a command sends
    /// none.
    pub default_quantize: Quantize,
    /// Bars of ring-buffer history captured by a lookback capture.
    pub lookback_bars: i32,
    /// Metronome click audible.
    pub click_enabled: bool,
    /// Engine sample rate in Hz.
    pub sample_rate: i32,
    /// MIDI clock sync enabled on the engine.
    pub midi_sync_enabled: bool,
    /// Engine has a MIDI clock output attached.
    pub midi_sync_output: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_quantize: Quantize::Bar,
            lookback_bars: 1,
            click_enabled: true,
            sample_rate: 44100,
            midi_sync_enabled: false,
            midi_sync_output: false,
        }
    }
}

/// Recording indicator: whether classic recording is active and on
/// which loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordingState {
    /// True while a loop is recording.
    pub active: bool,
    /// Index of the recording loop; -1 when none.
    pub loop_index: i32,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self {
            active: false,
            loop_index: -1,
        }
    }
}

/// The full replicated engine state.
///
/// One snapshot is created at client start and mutated exclusively by
/// inbound push handlers for the connected lifetime of the process.
/// Sub-records are replaced whole; there is no merging of partial
/// fields and no version history.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSnapshot {
    /// Transport position and tempo.
    pub metronome: MetronomeState,
    /// Loop slots, indexed 0..N-1. Grows, never shrinks.
    pub loops: Vec<LoopInfo>,
    /// Operations queued on the engine, in arrival order.
    pub pending_ops: Vec<PendingOp>,
    /// Classic-recording indicator.
    pub recording: RecordingState,
    /// Global engine settings.
    pub settings: EngineSettings,
    /// Recent server log messages, oldest first, bounded to
    /// [`MAX_MESSAGES`].
    pub messages: Vec<String>,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineSnapshot {
    /// Create a snapshot with default values: 8 empty loops, 120 BPM,
    /// 4/4, quantize=Bar.
    pub fn new() -> Self {
        Self {
            metronome: MetronomeState::default(),
            loops: vec![LoopInfo::default(); DEFAULT_LOOP_COUNT],
            pending_ops: Vec::new(),
            recording: RecordingState::default(),
            settings: EngineSettings::default(),
            messages: Vec::new(),
        }
    }

    /// Grow the loop sequence with default entries so that `index` is
    /// valid. Lower indices are untouched; the sequence never shrinks.
    pub fn ensure_loop_index(&mut self, index: usize) {
        if index >= self.loops.len() {
            self.loops.resize(index + 1, LoopInfo::default());
        }
    }

    /// Number of loops holding audio (any non-empty state).
    pub fn active_loop_count(&self) -> usize {
        self.loops.iter().filter(|lp| !lp.is_empty()).count()
    }
}
