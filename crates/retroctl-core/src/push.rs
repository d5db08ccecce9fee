//! Typed decoding of engine state pushes.
//!
//! Every inbound datagram decodes once into an [`EnginePush`] variant;
//! the listener then applies it to the mirror with a plain `match`.
//! There is no stringly-typed handler table - the set of push messages
//! is sealed here.
//!
//! The engine sends liblo-style typespecs, so numeric fields may arrive
//! as Int/Long or Float/Double depending on the sender; decoding
//! coerces rather than pinning one width. Anything else (unknown
//! address, short argument list, wrong type, out-of-range enum) is a
//! protocol violation surfaced as a [`DecodeError`].

use rosc::{OscMessage, OscType};
use thiserror::Error;

use crate::state::{
    EngineSettings, LoopInfo, LoopState, MetronomeState, PendingOp, Quantize,
};

/// A decoded state push from the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EnginePush {
    /// `/retro/state/metronome` - full metronome replacement.
    Metronome(MetronomeState),
    /// `/retro/state/loop` - full replacement of one loop slot.
    Loop { index: usize, info: LoopInfo },
    /// `/retro/state/recording` - recording indicator replacement.
    Recording { active: bool, loop_index: i32 },
    /// `/retro/state/settings` - settings replacement.
    Settings(EngineSettings),
    /// `/retro/state/pending_clear` - drop all pending operations.
    PendingClear,
    /// `/retro/state/pending_op` - one queued operation, appended.
    PendingOp(PendingOp),
    /// `/retro/state/log` - human-readable server notice.
    Log(String),
}

/// Protocol violation while decoding a push from the (trusted) engine.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("unknown address pattern: {0}")]
    UnknownAddress(String),
    #[error("{addr}: missing argument {index}")]
    MissingArg { addr: &'static str, index: usize },
    #[error("{addr}: argument {index} is not {expected}")]
    WrongType {
        addr: &'static str,
        index: usize,
        expected: &'static str,
    },
    #[error("{addr}: {value} is not a valid {what}")]
    OutOfRange {
        addr: &'static str,
        value: i32,
        what: &'static str,
    },
}

/// Positional argument cursor over one message.
struct Args<'a> {
    addr: &'static str,
    args: &'a [OscType],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(addr: &'static str, msg: &'a OscMessage) -> Self {
        Self {
            addr,
            args: &msg.args,
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<&'a OscType, DecodeError> {
        let arg = self.args.get(self.pos).ok_or(DecodeError::MissingArg {
            addr: self.addr,
            index: self.pos,
        })?;
        self.pos += 1;
        Ok(arg)
    }

    fn int(&mut self) -> Result<i32, DecodeError> {
        let index = self.pos;
        match self.next()? {
            OscType::Int(v) => Ok(*v),
            OscType::Long(v) => Ok(*v as i32),
            _ => Err(DecodeError::WrongType {
                addr: self.addr,
                index,
                expected: "an integer",
            }),
        }
    }

    fn long(&mut self) -> Result<i64, DecodeError> {
        let index = self.pos;
        match self.next()? {
            OscType::Long(v) => Ok(*v),
            OscType::Int(v) => Ok(*v as i64),
            _ => Err(DecodeError::WrongType {
                addr: self.addr,
                index,
                expected: "an integer",
            }),
        }
    }

    fn float(&mut self) -> Result<f64, DecodeError> {
        let index = self.pos;
        match self.next()? {
            OscType::Float(v) => Ok(*v as f64),
            OscType::Double(v) => Ok(*v),
            OscType::Int(v) => Ok(*v as f64),
            OscType::Long(v) => Ok(*v as f64),
            _ => Err(DecodeError::WrongType {
                addr: self.addr,
                index,
                expected: "a number",
            }),
        }
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let index = self.pos;
        match self.next()? {
            OscType::String(s) => Ok(s.clone()),
            _ => Err(DecodeError::WrongType {
                addr: self.addr,
                index,
                expected: "a string",
            }),
        }
    }

    fn flag(&mut self) -> Result<bool, DecodeError> {
        Ok(self.int()? != 0)
    }

    /// Optional trailing flag; absent means `false` (older engines send
    /// shorter settings messages).
    fn opt_flag(&mut self) -> Result<bool, DecodeError> {
        if self.pos >= self.args.len() {
            return Ok(false);
        }
        self.flag()
    }

    fn quantize(&mut self) -> Result<Quantize, DecodeError> {
        let v = self.int()?;
        Quantize::try_from(v).map_err(|value| DecodeError::OutOfRange {
            addr: self.addr,
            value,
            what: "quantize mode",
        })
    }
}

impl EnginePush {
    /// Decode one OSC message into a push variant.
    pub fn decode(msg: &OscMessage) -> Result<Self, DecodeError> {
        match msg.addr.as_str() {
            "/retro/state/metronome" => {
                let mut a = Args::new("/retro/state/metronome", msg);
                Ok(EnginePush::Metronome(MetronomeState {
                    bar: a.int()?,
                    beat: a.int()?,
                    beat_fraction: a.float()?,
                    bpm: a.float()?,
                    beats_per_bar: a.int()?,
                    running: a.flag()?,
                }))
            }
            "/retro/state/loop" => {
                let mut a = Args::new("/retro/state/loop", msg);
                let raw_index = a.int()?;
                let index =
                    usize::try_from(raw_index).map_err(|_| DecodeError::OutOfRange {
                        addr: "/retro/state/loop",
                        value: raw_index,
                        what: "loop index",
                    })?;
                let raw_state = a.int()?;
                let state =
                    LoopState::try_from(raw_state).map_err(|value| DecodeError::OutOfRange {
                        addr: "/retro/state/loop",
                        value,
                        what: "loop state",
                    })?;
                Ok(EnginePush::Loop {
                    index,
                    info: LoopInfo {
                        state,
                        length_in_bars: a.float()?,
                        layers: a.int()?,
                        active_layers: a.int()?,
                        speed: a.float()?,
                        reversed: a.flag()?,
                        play_position_pct: a.float()?,
                        length_samples: a.long()?,
                    },
                })
            }
            "/retro/state/recording" => {
                let mut a = Args::new("/retro/state/recording", msg);
                Ok(EnginePush::Recording {
                    active: a.flag()?,
                    loop_index: a.int()?,
                })
            }
            "/retro/state/settings" => {
                let mut a = Args::new("/retro/state/settings", msg);
                Ok(EnginePush::Settings(EngineSettings {
                    default_quantize: a.quantize()?,
                    lookback_bars: a.int()?,
                    click_enabled: a.flag()?,
                    sample_rate: a.int()?,
                    midi_sync_enabled: a.opt_flag()?,
                    midi_sync_output: a.opt_flag()?,
                }))
            }
            "/retro/state/pending_clear" => Ok(EnginePush::PendingClear),
            "/retro/state/pending_op" => {
                let mut a = Args::new("/retro/state/pending_op", msg);
                Ok(EnginePush::PendingOp(PendingOp {
                    loop_index: a.int()?,
                    quantize: a.quantize()?,
                    description: a.string()?,
                }))
            }
            "/retro/state/log" => {
                let mut a = Args::new("/retro/state/log", msg);
                Ok(EnginePush::Log(a.string()?))
            }
            other => Err(DecodeError::UnknownAddress(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn test_decode_metronome() {
        let push = EnginePush::decode(&msg(
            "/retro/state/metronome",
            vec![
                OscType::Int(2),
                OscType::Int(1),
                OscType::Double(0.5),
                OscType::Double(140.0),
                OscType::Int(4),
                OscType::Int(1),
            ],
        ))
        .unwrap();
        match push {
            EnginePush::Metronome(m) => {
                assert_eq!(m.bar, 2);
                assert_eq!(m.beat, 1);
                assert!((m.beat_fraction - 0.5).abs() < 1e-9);
                assert!((m.bpm - 140.0).abs() < 1e-9);
                assert_eq!(m.beats_per_bar, 4);
                assert!(m.running);
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[test]
    fn test_decode_metronome_float32_wire_form() {
        // Older senders encode the doubles as float32
        let push = EnginePush::decode(&msg(
            "/retro/state/metronome",
            vec![
                OscType::Int(0),
                OscType::Int(3),
                OscType::Float(0.25),
                OscType::Float(90.0),
                OscType::Int(3),
                OscType::Int(0),
            ],
        ))
        .unwrap();
        match push {
            EnginePush::Metronome(m) => {
                assert!((m.bpm - 90.0).abs() < 1e-6);
                assert!(!m.running);
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[test]
    fn test_decode_loop() {
        let push = EnginePush::decode(&msg(
            "/retro/state/loop",
            vec![
                OscType::Int(5),
                OscType::Int(1),
                OscType::Double(4.0),
                OscType::Int(3),
                OscType::Int(2),
                OscType::Double(0.5),
                OscType::Int(1),
                OscType::Double(0.75),
                OscType::Long(352800),
            ],
        ))
        .unwrap();
        match push {
            EnginePush::Loop { index, info } => {
                assert_eq!(index, 5);
                assert_eq!(info.state, LoopState::Playing);
                assert!((info.length_in_bars - 4.0).abs() < 1e-9);
                assert_eq!(info.layers, 3);
                assert_eq!(info.active_layers, 2);
                assert!((info.speed - 0.5).abs() < 1e-9);
                assert!(info.reversed);
                assert!((info.play_position_pct - 0.75).abs() < 1e-9);
                assert_eq!(info.length_samples, 352800);
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[test]
    fn test_decode_loop_negative_index_rejected() {
        let err = EnginePush::decode(&msg(
            "/retro/state/loop",
            vec![
                OscType::Int(-1),
                OscType::Int(0),
                OscType::Double(0.0),
                OscType::Int(0),
                OscType::Int(0),
                OscType::Double(1.0),
                OscType::Int(0),
                OscType::Double(0.0),
                OscType::Long(0),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { value: -1, .. }));
    }

    #[test]
    fn test_decode_recording() {
        let push = EnginePush::decode(&msg(
            "/retro/state/recording",
            vec![OscType::Int(1), OscType::Int(3)],
        ))
        .unwrap();
        assert_eq!(
            push,
            EnginePush::Recording {
                active: true,
                loop_index: 3
            }
        );
    }

    #[test]
    fn test_decode_settings_four_args() {
        let push = EnginePush::decode(&msg(
            "/retro/state/settings",
            vec![
                OscType::Int(1),
                OscType::Int(2),
                OscType::Int(0),
                OscType::Int(48000),
            ],
        ))
        .unwrap();
        match push {
            EnginePush::Settings(s) => {
                assert_eq!(s.default_quantize, Quantize::Beat);
                assert_eq!(s.lookback_bars, 2);
                assert!(!s.click_enabled);
                assert_eq!(s.sample_rate, 48000);
                assert!(!s.midi_sync_enabled);
                assert!(!s.midi_sync_output);
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[test]
    fn test_decode_settings_with_midi_sync_tail() {
        let push = EnginePush::decode(&msg(
            "/retro/state/settings",
            vec![
                OscType::Int(2),
                OscType::Int(1),
                OscType::Int(1),
                OscType::Int(44100),
                OscType::Int(1),
                OscType::Int(1),
            ],
        ))
        .unwrap();
        match push {
            EnginePush::Settings(s) => {
                assert!(s.midi_sync_enabled);
                assert!(s.midi_sync_output);
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[test]
    fn test_decode_pending_op_and_clear() {
        let push = EnginePush::decode(&msg(
            "/retro/state/pending_op",
            vec![
                OscType::Int(2),
                OscType::Int(2),
                OscType::String("Capture Loop".into()),
            ],
        ))
        .unwrap();
        assert_eq!(
            push,
            EnginePush::PendingOp(PendingOp {
                loop_index: 2,
                quantize: Quantize::Bar,
                description: "Capture Loop".into(),
            })
        );

        let push = EnginePush::decode(&msg("/retro/state/pending_clear", vec![])).unwrap();
        assert_eq!(push, EnginePush::PendingClear);
    }

    #[test]
    fn test_decode_log() {
        let push =
            EnginePush::decode(&msg("/retro/state/log", vec![OscType::String("hi".into())]))
                .unwrap();
        assert_eq!(push, EnginePush::Log("hi".into()));
    }

    #[test]
    fn test_unknown_address() {
        let err = EnginePush::decode(&msg("/retro/state/bogus", vec![])).unwrap_err();
        assert_eq!(err, DecodeError::UnknownAddress("/retro/state/bogus".into()));
    }

    #[test]
    fn test_missing_argument() {
        let err = EnginePush::decode(&msg(
            "/retro/state/recording",
            vec![OscType::Int(1)],
        ))
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingArg {
                addr: "/retro/state/recording",
                index: 1
            }
        );
    }

    #[test]
    fn test_wrong_argument_type() {
        let err = EnginePush::decode(&msg(
            "/retro/state/log",
            vec![OscType::Int(7)],
        ))
        .unwrap_err();
        assert!(matches!(err, DecodeError::WrongType { index: 0, .. }));
    }

    #[test]
    fn test_out_of_range_quantize() {
        let err = EnginePush::decode(&msg(
            "/retro/state/settings",
            vec![
                OscType::Int(9),
                OscType::Int(1),
                OscType::Int(1),
                OscType::Int(44100),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { value: 9, .. }));
    }
}
