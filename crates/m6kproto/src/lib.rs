//! Decoder for the TC Electronic M6000 Icon/Frame control protocol.
//!
//! The Icon controller talks to an M6000 Frame over UDP (discovery) and
//! TCP (commands). TCP carries length-prefixed blocks, blocks carry MIDI
//! SysEx messages, and SysEx messages carry the commands.
//!
//! # Crate Structure
//!
//! - [`frame`]: Direction and the length-prefixed block layer
//! - [`midi`]: SysEx reassembly, bit packing and command decoding
//! - [`peer`]: Peer identification, discovery datagrams and [`peer::Session`]

/// Re-export block framing types.
pub mod frame {
    pub use m6kproto_frame::*;
}

/// Re-export MIDI and command types.
pub mod midi {
    pub use m6kproto_midi::*;
}

/// Re-export peer and session types.
pub mod peer {
    pub use m6kproto_peer::*;
}

pub use m6kproto_peer::{DissectResult, Session, SessionConfig};
