//! Peer identification, discovery decoding and per-session dissection.
//!
//! This is the layer a capture front end or a packet-inspection host talks
//! to. A [`Session`] owns everything one capture needs: who is the Icon and
//! who is the Frame, one block framer and one SysEx reassembler per
//! direction, and the command decoder. Sessions never share state.

pub mod discovery;
pub mod error;
pub mod fields;
pub mod identity;
pub mod observer;
pub mod session;

pub use discovery::{
    decode_discovery, has_magic, DiscoveryDecoded, DiscoveryKind, DiscoveryMessage, ProbeResponse,
    DISCOVERY_MAGIC,
};
pub use error::{DiscoveryError, DissectError, Result};
pub use fields::{FieldDescriptor, FieldId};
pub use identity::{Observation, PeerIdentifier, PeerIdentity, Route};
pub use observer::{Observer, TraceEvent};
pub use session::{
    DissectResult, MessageOutcome, MessageReport, Session, SessionConfig, COMMAND_TCP_PORT,
    DISCOVERY_UDP_PORT,
};
