//! UDP discovery datagrams.
//!
//! All three shapes start with the same 4-byte magic. What follows depends
//! on who sent the datagram to whom, so callers classify the datagram with
//! [`PeerIdentifier`](crate::PeerIdentifier) first and pick a
//! [`DiscoveryKind`].
//!
//! Offsets below were worked out from captures and are not confirmed for
//! every firmware.

use std::fmt;

use bytes::Bytes;
use tracing::debug;

use crate::error::DiscoveryError;
use crate::fields::{FieldDescriptor, FieldId};

pub const DISCOVERY_MAGIC: u32 = 0x1234_5678;
pub const MAGIC_LEN: usize = 4;

/// Tag an Icon puts in its discovery probes.
pub const ICON_TAG: &[u8; 6] = b"TCIcon";
pub const ICON_TAG_OFFSET: usize = 4;

pub const FRAME_SERIAL_OFFSET: usize = 4;
pub const TOTAL_MESSAGES_OFFSET: usize = 8;
pub const PROBE_UNKNOWN_OFFSET: usize = 9;
pub const PROBE_UNKNOWN_LEN: usize = 7;
pub const CURRENT_MESSAGE_OFFSET: usize = 0x13;
pub const FILE_NAME_OFFSET: usize = 0x14;
pub const FRAME_NAME_OFFSET: usize = 0x54;

pub const ICON_COMMAND_OFFSET: usize = 4;
pub const ICON_COMMAND_LEN: usize = 11;

pub const ICON_NAME_OFFSET: usize = 4;
pub const ICON_NAME_LEN: usize = 12;

/// Which of the three discovery shapes a datagram is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    /// Frame to Icon.
    ProbeResponse,
    /// Icon to Frame.
    IconCommand,
    /// Icon to a broadcast address.
    IconBroadcast,
}

/// A Frame's answer to an Icon probe. Large transfers are split over
/// several responses, numbered by `current_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub frame_serial: u32,
    pub total_messages: u8,
    pub current_message: u8,
    pub unknown: Bytes,
    pub file_name: String,
    pub frame_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMessage {
    ProbeResponse(ProbeResponse),
    IconCommand { command: String },
    IconBroadcast { device_name: String, trailer: Bytes },
}

impl fmt::Display for DiscoveryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMessage::ProbeResponse(r) => write!(
                f,
                "Frame probe response: serial {}, message {}/{}, file '{}', frame '{}'",
                r.frame_serial,
                u16::from(r.current_message) + 1,
                r.total_messages,
                r.file_name,
                r.frame_name
            ),
            DiscoveryMessage::IconCommand { command } => write!(f, "Icon command '{command}'"),
            DiscoveryMessage::IconBroadcast {
                device_name,
                trailer,
            } => write!(
                f,
                "Icon broadcast '{device_name}' ({} trailer bytes)",
                trailer.len()
            ),
        }
    }
}

/// A decoded datagram plus where its fields are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDecoded {
    pub message: DiscoveryMessage,
    pub fields: Vec<FieldDescriptor>,
}

/// First four bytes are the discovery magic.
pub fn has_magic(payload: &[u8]) -> bool {
    leading_word(payload) == Some(DISCOVERY_MAGIC)
}

pub fn decode_discovery(
    kind: DiscoveryKind,
    payload: &[u8],
) -> Result<DiscoveryDecoded, DiscoveryError> {
    check_magic(payload)?;
    let decoded = match kind {
        DiscoveryKind::ProbeResponse => decode_probe_response(payload)?,
        DiscoveryKind::IconCommand => decode_icon_command(payload),
        DiscoveryKind::IconBroadcast => decode_icon_broadcast(payload),
    };
    debug!(?kind, message = %decoded.message, "discovery decoded");
    Ok(decoded)
}

fn decode_probe_response(payload: &[u8]) -> Result<DiscoveryDecoded, DiscoveryError> {
    let needed = FILE_NAME_OFFSET;
    if payload.len() < needed {
        return Err(DiscoveryError::TooShort {
            needed,
            actual: payload.len(),
        });
    }

    let frame_serial = u32::from_be_bytes([
        payload[FRAME_SERIAL_OFFSET],
        payload[FRAME_SERIAL_OFFSET + 1],
        payload[FRAME_SERIAL_OFFSET + 2],
        payload[FRAME_SERIAL_OFFSET + 3],
    ]);
    let (file_name, file_len) = nul_terminated(payload, FILE_NAME_OFFSET);
    let (frame_name, frame_len) = nul_terminated(payload, FRAME_NAME_OFFSET);

    let mut fields = vec![
        FieldDescriptor::new(FieldId::DiscoveryMagic, 0, MAGIC_LEN),
        FieldDescriptor::new(FieldId::FrameSerial, FRAME_SERIAL_OFFSET, 4),
        FieldDescriptor::new(FieldId::MessagesCount, TOTAL_MESSAGES_OFFSET, 1),
        FieldDescriptor::new(FieldId::MessageNumber, CURRENT_MESSAGE_OFFSET, 1),
        FieldDescriptor::new(FieldId::FileName, FILE_NAME_OFFSET, file_len),
    ];
    if payload.len() > FRAME_NAME_OFFSET {
        fields.push(FieldDescriptor::new(
            FieldId::FrameName,
            FRAME_NAME_OFFSET,
            frame_len,
        ));
    }

    Ok(DiscoveryDecoded {
        message: DiscoveryMessage::ProbeResponse(ProbeResponse {
            frame_serial,
            total_messages: payload[TOTAL_MESSAGES_OFFSET],
            current_message: payload[CURRENT_MESSAGE_OFFSET],
            unknown: Bytes::copy_from_slice(window(
                payload,
                PROBE_UNKNOWN_OFFSET,
                PROBE_UNKNOWN_LEN,
            )),
            file_name,
            frame_name,
        }),
        fields,
    })
}

fn decode_icon_command(payload: &[u8]) -> DiscoveryDecoded {
    let raw = window(payload, ICON_COMMAND_OFFSET, ICON_COMMAND_LEN);
    DiscoveryDecoded {
        message: DiscoveryMessage::IconCommand {
            command: trim_nul(raw),
        },
        fields: vec![
            FieldDescriptor::new(FieldId::DiscoveryMagic, 0, MAGIC_LEN),
            FieldDescriptor::new(FieldId::IconCommand, ICON_COMMAND_OFFSET, raw.len()),
        ],
    }
}

fn decode_icon_broadcast(payload: &[u8]) -> DiscoveryDecoded {
    let raw = window(payload, ICON_NAME_OFFSET, ICON_NAME_LEN);
    let trailer = payload
        .get(ICON_NAME_OFFSET + ICON_NAME_LEN..)
        .unwrap_or_default();
    DiscoveryDecoded {
        message: DiscoveryMessage::IconBroadcast {
            device_name: trim_nul(raw),
            trailer: Bytes::copy_from_slice(trailer),
        },
        fields: vec![
            FieldDescriptor::new(FieldId::DiscoveryMagic, 0, MAGIC_LEN),
            FieldDescriptor::new(FieldId::IconName, ICON_NAME_OFFSET, raw.len()),
        ],
    }
}

fn check_magic(payload: &[u8]) -> Result<(), DiscoveryError> {
    match leading_word(payload) {
        None => Err(DiscoveryError::TooShort {
            needed: MAGIC_LEN,
            actual: payload.len(),
        }),
        Some(DISCOVERY_MAGIC) => Ok(()),
        Some(other) => Err(DiscoveryError::MissingMagic(other)),
    }
}

fn leading_word(payload: &[u8]) -> Option<u32> {
    let word: [u8; 4] = payload.get(..MAGIC_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(word))
}

/// Up to `len` bytes from `offset`, clamped to the payload.
fn window(payload: &[u8], offset: usize, len: usize) -> &[u8] {
    let start = offset.min(payload.len());
    let end = offset.saturating_add(len).min(payload.len());
    &payload[start..end]
}

/// String starting at `offset`, up to the first NUL or the end of the
/// payload. Returns the string and the number of bytes it spans.
fn nul_terminated(payload: &[u8], offset: usize) -> (String, usize) {
    let tail = payload.get(offset..).unwrap_or_default();
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    (String::from_utf8_lossy(&tail[..end]).into_owned(), end)
}

fn trim_nul(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches('\0')
        .to_string()
}
