use bytes::BytesMut;
use m6kproto_frame::Direction;
use tracing::{debug, warn};

use crate::error::{MidiError, Result};
use crate::message::{MidiMessage, RESET_START, SYSEX_END, SYSEX_START};

/// Joins block payloads of one direction into complete MIDI messages.
///
/// A payload that opens a SysEx (`F0`) without closing it (`F7`) is kept
/// and prefixed to the next payload, for as many blocks as it takes.
#[derive(Debug)]
pub struct SysExReassembler {
    direction: Direction,
    pending: Option<BytesMut>,
}

impl SysExReassembler {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            pending: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Feed one block payload.
    ///
    /// Returns `Ok(None)` while a SysEx is still incomplete. A reset always
    /// completes immediately and drops any partial SysEx of this direction.
    pub fn push(&mut self, payload: &[u8]) -> Result<Option<MidiMessage>> {
        if payload.first() == Some(&RESET_START) {
            if let Some(stale) = self.pending.take() {
                warn!(
                    direction = %self.direction,
                    dropped = stale.len(),
                    "reset received, dropping partial SysEx"
                );
            }
            return Ok(Some(MidiMessage::Reset));
        }

        let data = match self.pending.take() {
            Some(mut pending) => {
                debug!(
                    direction = %self.direction,
                    pending = pending.len(),
                    added = payload.len(),
                    "continuing partial SysEx"
                );
                pending.extend_from_slice(payload);
                pending
            }
            None => BytesMut::from(payload),
        };

        match (data.first().copied(), data.last().copied()) {
            (None, _) => Err(MidiError::Empty),
            (Some(SYSEX_START), Some(SYSEX_END)) if data.len() >= 2 => {
                debug!(direction = %self.direction, len = data.len(), "SysEx complete");
                Ok(Some(MidiMessage::SysEx(data.freeze())))
            }
            (Some(SYSEX_START), _) => {
                debug!(
                    direction = %self.direction,
                    pending = data.len(),
                    "incomplete SysEx kept for next block"
                );
                self.pending = Some(data);
                Ok(None)
            }
            (Some(first), _) => Err(MidiError::UnrecognizedStart(first)),
        }
    }

    /// Bytes of an unfinished SysEx waiting for more blocks.
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, BytesMut::len)
    }

    /// Drop any unfinished SysEx. Returns the number of bytes discarded.
    pub fn discard(&mut self) -> usize {
        self.pending.take().map_or(0, |p| p.len())
    }
}
