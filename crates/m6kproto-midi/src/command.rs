//! Command codes and decoded command variants.
//!
//! Request codes sit 0x25 above their response (PresetRequest 0x45 answers
//! with PresetData 0x20, and so on).

use std::fmt;

use bytes::Bytes;

use crate::packing::midi_14bit;

/// Fixed overhead of a ParamData reply: engine, param id and two unknown
/// bytes. Empirically derived.
pub const PARAM_RESPONSE_OVERHEAD: usize = 4;

/// Every command byte observed between an Icon and an M6000 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    PresetData,
    /// 72 or 124 byte messages.
    RhythmData,
    ParamData,
    Unknown23,
    Unknown28,
    Unknown29,
    /// Licence code validation result.
    CodeCmdResponse,
    Unknown2F,
    BankRequest,
    Unknown43,
    PresetRecall,
    PresetRequest,
    RhythmRequest,
    ParamRequest,
    Unknown49,
    Unknown4A,
    PresetCommand,
    MediaCommand,
    /// Licence code submission.
    CodeCmd,
    Unknown4F,
}

impl CommandKind {
    /// Map a command byte to its kind, if known.
    pub fn from_code(code: u8) -> Option<Self> {
        let kind = match code {
            0x20 => Self::PresetData,
            0x21 => Self::RhythmData,
            0x22 => Self::ParamData,
            0x23 => Self::Unknown23,
            0x28 => Self::Unknown28,
            0x29 => Self::Unknown29,
            0x2E => Self::CodeCmdResponse,
            0x2F => Self::Unknown2F,
            0x40 => Self::BankRequest,
            0x43 => Self::Unknown43,
            0x44 => Self::PresetRecall,
            0x45 => Self::PresetRequest,
            0x46 => Self::RhythmRequest,
            0x47 => Self::ParamRequest,
            0x49 => Self::Unknown49,
            0x4A => Self::Unknown4A,
            0x4C => Self::PresetCommand,
            0x4D => Self::MediaCommand,
            0x4E => Self::CodeCmd,
            0x4F => Self::Unknown4F,
            _ => return None,
        };
        Some(kind)
    }

    /// The command byte.
    pub fn code(self) -> u8 {
        match self {
            Self::PresetData => 0x20,
            Self::RhythmData => 0x21,
            Self::ParamData => 0x22,
            Self::Unknown23 => 0x23,
            Self::Unknown28 => 0x28,
            Self::Unknown29 => 0x29,
            Self::CodeCmdResponse => 0x2E,
            Self::Unknown2F => 0x2F,
            Self::BankRequest => 0x40,
            Self::Unknown43 => 0x43,
            Self::PresetRecall => 0x44,
            Self::PresetRequest => 0x45,
            Self::RhythmRequest => 0x46,
            Self::ParamRequest => 0x47,
            Self::Unknown49 => 0x49,
            Self::Unknown4A => 0x4A,
            Self::PresetCommand => 0x4C,
            Self::MediaCommand => 0x4D,
            Self::CodeCmd => 0x4E,
            Self::Unknown4F => 0x4F,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::PresetData => "PresetData",
            Self::RhythmData => "RhythmData",
            Self::ParamData => "ParamData",
            Self::Unknown23 => "Frame to Icon unknown 0x23",
            Self::Unknown28 => "Frame to Icon unknown 0x28",
            Self::Unknown29 => "Frame to Icon unknown 0x29",
            Self::CodeCmdResponse => "Licence submit response",
            Self::Unknown2F => "Frame to Icon unknown 0x2F",
            Self::BankRequest => "BankRequest",
            Self::Unknown43 => "Icon to Frame unknown 0x43",
            Self::PresetRecall => "PresetRecall",
            Self::PresetRequest => "PresetRequest",
            Self::RhythmRequest => "RhythmRequest",
            Self::ParamRequest => "ParamRequest",
            Self::Unknown49 => "Icon to Frame unknown 0x49",
            Self::Unknown4A => "Icon to Frame unknown 0x4A",
            Self::PresetCommand => "Icon to Frame preset command",
            Self::MediaCommand => "Icon to Frame media command",
            Self::CodeCmd => "Licence submit",
            Self::Unknown4F => "Icon to Frame unknown 0x4F",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result code of a licence code submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeResult {
    Success,
    /// Also what the frame falls back to for invalid error codes.
    UnspecifiedError,
    LengthInvalid,
    IdentifierInvalid,
    LevelInvalid,
    ChecksumInvalid,
    EepromInvalid,
    /// A result byte outside the known table.
    Unknown(u8),
    /// The response did not have the expected 3 bytes.
    UnexpectedLength(usize),
}

impl CodeResult {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::UnspecifiedError,
            2 => Self::LengthInvalid,
            3 => Self::IdentifierInvalid,
            4 => Self::LevelInvalid,
            5 => Self::ChecksumInvalid,
            6 => Self::EepromInvalid,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for CodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::UnspecifiedError => f.write_str("unspecified error"),
            Self::LengthInvalid => f.write_str("length invalid"),
            Self::IdentifierInvalid => f.write_str("identifier invalid"),
            Self::LevelInvalid => f.write_str("level invalid"),
            Self::ChecksumInvalid => f.write_str("checksum invalid"),
            Self::EepromInvalid => f.write_str("EEPROM invalid"),
            Self::Unknown(code) => write!(f, "unknown result 0x{code:02x}"),
            Self::UnexpectedLength(len) => write!(f, "unexpected response length {len}"),
        }
    }
}

/// One 7-bit packed value of a ParamData reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamValue {
    pub raw: [u8; 2],
    pub unsigned: u16,
    pub signed: i16,
}

/// A decoded command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ParamRequest {
        engine: u8,
        param_id: u8,
        unk_a: u8,
        unk_b: u8,
        count: u16,
    },
    ParamData {
        engine: u8,
        param_id: u8,
        unk_a: u8,
        unk_b: u8,
        values: Vec<ParamValue>,
        /// Odd byte left after the last value pair.
        trailing: Option<u8>,
    },
    PresetRequest {
        preset: u16,
    },
    PresetData {
        preset: u16,
        unknown: u8,
        /// Nibble-pair decoded preset bytes.
        data: Vec<u8>,
    },
    PresetRecall {
        engine: u8,
        preset: u16,
    },
    RhythmRequest {
        /// Bytes present although the request normally has none.
        extra: usize,
    },
    RhythmData {
        payload: Bytes,
    },
    CodeCmd {
        code: String,
    },
    CodeCmdResponse {
        result: CodeResult,
    },
    /// A known command whose layout is not decoded.
    Opaque {
        kind: CommandKind,
        payload: Bytes,
    },
    Unrecognized {
        code: u8,
        payload: Bytes,
    },
}

impl Command {
    /// Reply size the Frame is expected to send for a ParamRequest.
    pub fn expected_response_size(count: u16) -> usize {
        usize::from(count) * 2 + PARAM_RESPONSE_OVERHEAD
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ParamRequest {
                engine,
                param_id,
                unk_a,
                unk_b,
                count,
            } => write!(
                f,
                "Param request engine {engine} param {param_id}: {count} values, response size {} [unkA 0x{unk_a:02x} unkB 0x{unk_b:02x}]",
                Command::expected_response_size(*count)
            ),
            Command::ParamData {
                engine,
                param_id,
                unk_a,
                unk_b,
                values,
                trailing,
            } => {
                write!(
                    f,
                    "Param data engine {engine} param {param_id} [unk {}]: {} values",
                    midi_14bit(*unk_a, *unk_b),
                    values.len()
                )?;
                for (i, v) in values.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}0x{:04x} ({:+})", v.unsigned, v.signed)?;
                }
                if let Some(byte) = trailing {
                    write!(f, " [trailing 0x{byte:02x}]")?;
                }
                Ok(())
            }
            Command::PresetRequest { preset } => write!(f, "Preset request {preset}"),
            Command::PresetData {
                preset,
                unknown,
                data,
            } => write!(
                f,
                "Preset data {preset}: {} bytes [unk 0x{unknown:02x}]",
                data.len()
            ),
            Command::PresetRecall { engine, preset } => {
                write!(f, "Recall preset {preset} on engine {engine}")
            }
            Command::RhythmRequest { extra: 0 } => f.write_str("Rhythm request"),
            Command::RhythmRequest { extra } => {
                write!(f, "Rhythm request ({extra} unexpected bytes)")
            }
            Command::RhythmData { payload } => {
                write!(f, "Rhythm data ({} bytes)", payload.len())
            }
            Command::CodeCmd { code } => write!(f, "Licence submit: {code}"),
            Command::CodeCmdResponse { result } => write!(f, "Licence response: {result}"),
            Command::Opaque { kind, payload } => {
                write!(f, "[{kind}] {} bytes", payload.len())
            }
            Command::Unrecognized { code, payload } => write!(
                f,
                "unrecognized command 0x{code:02x} ({} bytes)",
                payload.len()
            ),
        }
    }
}
