//! SysEx reassembly and command decoding for the TC M6000 control protocol.
//!
//! Block payloads carry either a MIDI reset (`FF 00 00`) or a TC
//! Electronic SysEx message:
//!
//! ```text
//! F0 | 00 20 1F | device id | 46 | command | payload ... | F7
//! ```
//!
//! A SysEx message may span several blocks; [`SysExReassembler`] joins
//! them per direction. [`CommandDecoder`] turns a complete message into a
//! typed [`Command`].

pub mod command;
pub mod decoder;
pub mod error;
pub mod message;
pub mod packing;
pub mod reassembler;

pub use command::{CodeResult, Command, CommandKind, ParamValue};
pub use decoder::{CommandDecoder, CommandResult, DecoderConfig};
pub use error::{MidiError, Result};
pub use message::{
    MidiMessage, SysExEnvelope, M6000_MODEL_ID, RESET, SYSEX_END, SYSEX_START, TC_MANUFACTURER_ID,
};
pub use packing::{decode_nibble_pairs, midi_14bit, nibble_pair, signed_14bit, SignBitMode};
pub use reassembler::SysExReassembler;
