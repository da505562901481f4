use bytes::Bytes;
use tracing::debug;

use crate::command::{CodeResult, Command, CommandKind, ParamValue};
use crate::error::{MidiError, Result};
use crate::message::SysExEnvelope;
use crate::packing::{decode_nibble_pairs, midi_14bit, signed_14bit, SignBitMode};

/// Decoder behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Sign test applied to ParamData values.
    pub sign_bit: SignBitMode,
}

impl DecoderConfig {
    pub fn with_sign_bit(mut self, mode: SignBitMode) -> Self {
        self.sign_bit = mode;
        self
    }
}

/// A decoded SysEx command ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command_type: u8,
    pub device_id: u8,
    pub command: Command,
    pub description: String,
}

/// Validates TC SysEx envelopes and decodes their payloads.
///
/// Holds configuration only; decoding one message never affects another.
#[derive(Debug, Clone, Default)]
pub struct CommandDecoder {
    config: DecoderConfig,
}

impl CommandDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Parse, validate and decode a raw `F0 ... F7` message.
    pub fn decode_sysex(&self, raw: &[u8]) -> Result<CommandResult> {
        let envelope = SysExEnvelope::parse(raw)?;
        self.decode(&envelope)
    }

    /// Validate an envelope and decode its payload.
    pub fn decode(&self, envelope: &SysExEnvelope) -> Result<CommandResult> {
        envelope.validate()?;
        let command = self.decode_command(envelope.command_type, &envelope.payload)?;
        let description = command.to_string();
        debug!(
            command_type = envelope.command_type,
            device_id = envelope.device_id,
            %description,
            "command decoded"
        );
        Ok(CommandResult {
            command_type: envelope.command_type,
            device_id: envelope.device_id,
            command,
            description,
        })
    }

    /// Decode a command payload given its command byte.
    pub fn decode_command(&self, code: u8, payload: &Bytes) -> Result<Command> {
        let Some(kind) = CommandKind::from_code(code) else {
            return Ok(Command::Unrecognized {
                code,
                payload: payload.clone(),
            });
        };

        match kind {
            CommandKind::ParamRequest => {
                require(kind, payload, 6)?;
                Ok(Command::ParamRequest {
                    engine: payload[0],
                    param_id: payload[1],
                    unk_a: payload[2],
                    unk_b: payload[3],
                    count: midi_14bit(payload[4], payload[5]),
                })
            }
            CommandKind::ParamData => {
                require(kind, payload, 4)?;
                let body = &payload[4..];
                let pairs = body.chunks_exact(2);
                let trailing = pairs.remainder().first().copied();
                let values = pairs
                    .map(|pair| ParamValue {
                        raw: [pair[0], pair[1]],
                        unsigned: midi_14bit(pair[0], pair[1]),
                        signed: signed_14bit(pair[0], pair[1], self.config.sign_bit),
                    })
                    .collect();
                Ok(Command::ParamData {
                    engine: payload[0],
                    param_id: payload[1],
                    unk_a: payload[2],
                    unk_b: payload[3],
                    values,
                    trailing,
                })
            }
            CommandKind::PresetRequest => {
                require(kind, payload, 2)?;
                Ok(Command::PresetRequest {
                    preset: preset_number(payload),
                })
            }
            CommandKind::PresetData => {
                require(kind, payload, 3)?;
                Ok(Command::PresetData {
                    preset: preset_number(payload),
                    unknown: payload[2],
                    data: decode_nibble_pairs(&payload[3..]),
                })
            }
            CommandKind::PresetRecall => {
                require(kind, payload, 3)?;
                Ok(Command::PresetRecall {
                    engine: payload[0],
                    preset: midi_14bit(payload[1], payload[2]),
                })
            }
            CommandKind::RhythmRequest => Ok(Command::RhythmRequest {
                extra: payload.len(),
            }),
            CommandKind::RhythmData => Ok(Command::RhythmData {
                payload: payload.clone(),
            }),
            CommandKind::CodeCmd => {
                require(kind, payload, 2)?;
                let decoded = decode_nibble_pairs(&payload[2..]);
                Ok(Command::CodeCmd {
                    code: String::from_utf8_lossy(&decoded).into_owned(),
                })
            }
            CommandKind::CodeCmdResponse => {
                let result = match &payload[..] {
                    [_, _, code] => CodeResult::from_code(*code),
                    other => CodeResult::UnexpectedLength(other.len()),
                };
                Ok(Command::CodeCmdResponse { result })
            }
            other => Ok(Command::Opaque {
                kind: other,
                payload: payload.clone(),
            }),
        }
    }
}

/// Preset numbers are sent low byte first, unlike the 7-bit packed fields.
fn preset_number(payload: &[u8]) -> u16 {
    u16::from(payload[1]) << 8 | u16::from(payload[0])
}

fn require(kind: CommandKind, payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(MidiError::PayloadTooShort {
            command: kind.name(),
            needed,
            actual: payload.len(),
        });
    }
    Ok(())
}
