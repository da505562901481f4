/// Errors that can occur while reassembling or decoding MIDI messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MidiError {
    /// A block carried no bytes and there was nothing pending.
    #[error("empty MIDI message")]
    Empty,

    /// The first byte is neither a reset nor a SysEx start.
    #[error("unrecognized message start 0x{0:02x}")]
    UnrecognizedStart(u8),

    /// The bytes are not wrapped in `F0 ... F7`.
    #[error("not a SysEx message")]
    NotSysEx,

    /// The SysEx message is too short to hold the TC envelope.
    #[error("SysEx envelope too short ({len} bytes)")]
    EnvelopeTooShort { len: usize },

    /// Manufacturer id is not TC Electronic (`00 20 1F`).
    #[error("not a TC Electronic manufacturer id: {:02x} {:02x} {:02x}", .0[0], .0[1], .0[2])]
    InvalidManufacturer([u8; 3]),

    /// Model id is not the M6000 (`0x46`).
    #[error("not an M6000 model id: 0x{0:02x}")]
    InvalidModel(u8),

    /// The command payload is shorter than its fixed layout.
    #[error("payload too short for command {command} ({actual} bytes, need {needed})")]
    PayloadTooShort {
        command: &'static str,
        needed: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, MidiError>;
