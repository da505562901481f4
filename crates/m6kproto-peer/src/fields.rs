//! Field descriptors handed to a packet-inspection host.
//!
//! The core only says where a field lives (offset and length inside the
//! packet payload); rendering is up to the host.

use m6kproto_frame::{BLOCK_VERSION, HEADER_SIZE};
use m6kproto_midi::message::COMMAND_OFFSET;
use m6kproto_midi::SYSEX_START;

/// Fields a host can register and filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    DiscoveryMagic,
    FrameSerial,
    MessagesCount,
    MessageNumber,
    FileName,
    FrameName,
    IconName,
    IconCommand,
    ProtoVersion,
    BlockSize,
    MessageType,
}

impl FieldId {
    /// Every field, in registration order.
    pub const ALL: [FieldId; 11] = [
        FieldId::DiscoveryMagic,
        FieldId::FrameSerial,
        FieldId::MessagesCount,
        FieldId::MessageNumber,
        FieldId::FileName,
        FieldId::FrameName,
        FieldId::IconName,
        FieldId::IconCommand,
        FieldId::ProtoVersion,
        FieldId::BlockSize,
        FieldId::MessageType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldId::DiscoveryMagic => "Discovery magic",
            FieldId::FrameSerial => "Serial number",
            FieldId::MessagesCount => "Msg count",
            FieldId::MessageNumber => "Msg number",
            FieldId::FileName => "File name",
            FieldId::FrameName => "Frame name",
            FieldId::IconName => "Icon name",
            FieldId::IconCommand => "Icon command",
            FieldId::ProtoVersion => "Protocol version",
            FieldId::BlockSize => "Block size",
            FieldId::MessageType => "Message type",
        }
    }

    /// Display filter name.
    pub fn filter(self) -> &'static str {
        match self {
            FieldId::DiscoveryMagic => "tcm6000.magic",
            FieldId::FrameSerial => "tcm6000.serial",
            FieldId::MessagesCount => "tcm6000.msgcount",
            FieldId::MessageNumber => "tcm6000.msgnum",
            FieldId::FileName => "tcm6000.filename",
            FieldId::FrameName => "tcm6000.framename",
            FieldId::IconName => "tcm6000.iconname",
            FieldId::IconCommand => "tcm6000.iconcmd",
            FieldId::ProtoVersion => "tcm6000.version",
            FieldId::BlockSize => "tcm6000.bs",
            FieldId::MessageType => "tcm6000.msgtype",
        }
    }
}

/// Where one field sits in a packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: FieldId,
    pub offset: usize,
    pub length: usize,
}

impl FieldDescriptor {
    pub fn new(field: FieldId, offset: usize, length: usize) -> Self {
        Self {
            field,
            offset,
            length,
        }
    }
}

/// Walk a TCP segment that starts on a block boundary and describe each
/// block header (and the SysEx command byte when it lies in the segment).
///
/// Stops at the first header that does not fit in the segment.
pub fn block_fields(segment: &[u8]) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    let mut offset = 0usize;

    while offset + HEADER_SIZE <= segment.len() {
        let version = u16::from_be_bytes([segment[offset], segment[offset + 1]]);
        let length = u16::from_be_bytes([segment[offset + 2], segment[offset + 3]]) as usize;
        fields.push(FieldDescriptor::new(FieldId::ProtoVersion, offset, 2));
        fields.push(FieldDescriptor::new(FieldId::BlockSize, offset + 2, 2));

        let body = offset + HEADER_SIZE;
        let command = body + COMMAND_OFFSET;
        if version == BLOCK_VERSION
            && segment.get(body) == Some(&SYSEX_START)
            && command < segment.len()
            && command < body + length
        {
            fields.push(FieldDescriptor::new(FieldId::MessageType, command, 1));
        }

        offset = body + length;
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_unique() {
        let mut filters: Vec<_> = FieldId::ALL.iter().map(|f| f.filter()).collect();
        filters.sort_unstable();
        filters.dedup();
        assert_eq!(filters.len(), FieldId::ALL.len());
    }

    #[test]
    fn block_fields_for_two_blocks() {
        let segment = [
            0x00, 0x02, 0x00, 0x03, 0xFF, 0x00, 0x00, // reset
            0x00, 0x02, 0x00, 0x08, 0xF0, 0x00, 0x20, 0x1F, 0x00, 0x46, 0x45, 0xF7,
        ];
        let fields = block_fields(&segment);
        assert_eq!(
            fields,
            vec![
                FieldDescriptor::new(FieldId::ProtoVersion, 0, 2),
                FieldDescriptor::new(FieldId::BlockSize, 2, 2),
                FieldDescriptor::new(FieldId::ProtoVersion, 7, 2),
                FieldDescriptor::new(FieldId::BlockSize, 9, 2),
                FieldDescriptor::new(FieldId::MessageType, 17, 1),
            ]
        );
    }

    #[test]
    fn message_type_points_at_envelope_command() {
        let segment = [
            0x00, 0x02, 0x00, 0x09, 0xF0, 0x00, 0x20, 0x1F, 0x00, 0x46, 0x45, 0x05, 0xF7,
        ];
        let envelope = m6kproto_midi::SysExEnvelope::parse(&segment[HEADER_SIZE..]).unwrap();
        let field = block_fields(&segment)
            .into_iter()
            .find(|f| f.field == FieldId::MessageType)
            .unwrap();
        assert_eq!(segment[field.offset], envelope.command_type);
    }

    #[test]
    fn block_fields_stops_at_partial_header() {
        let fields = block_fields(&[0x00, 0x02, 0x00, 0x01, 0xFF, 0x00, 0x02]);
        assert_eq!(fields.len(), 2);
    }
}
