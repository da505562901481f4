use std::net::IpAddr;

use m6kproto_frame::{Block, Direction};
use m6kproto_midi::MidiMessage;

/// Intermediate artifacts of a session, for callers that want to dump or
/// inspect them. The session itself never writes anywhere.
#[derive(Debug)]
pub enum TraceEvent<'a> {
    IconIdentified {
        icon: IpAddr,
    },
    FrameIdentified {
        frame: IpAddr,
    },
    /// A TCP segment reached a framer.
    Segment {
        seq: u64,
        direction: Direction,
        payload: &'a [u8],
    },
    /// A complete block came out of a framer.
    Block {
        seq: u64,
        direction: Direction,
        block: &'a Block,
    },
    /// A complete MIDI message came out of a reassembler.
    Message {
        seq: u64,
        direction: Direction,
        message: &'a MidiMessage,
    },
    /// Partial state was dropped by [`Session::discard_partial`](crate::Session::discard_partial).
    PartialDiscarded {
        direction: Direction,
        block_bytes: usize,
        sysex_bytes: usize,
    },
}

/// Receives [`TraceEvent`]s from a session.
///
/// Any `FnMut(&TraceEvent)` closure is an observer.
pub trait Observer {
    fn on_event(&mut self, event: &TraceEvent<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&TraceEvent<'_>),
{
    fn on_event(&mut self, event: &TraceEvent<'_>) {
        self(event)
    }
}
