use bytes::Bytes;

use crate::error::{MidiError, Result};

/// Start of System Exclusive.
pub const SYSEX_START: u8 = 0xF0;

/// End of System Exclusive.
pub const SYSEX_END: u8 = 0xF7;

/// Leading byte of a reset message.
pub const RESET_START: u8 = 0xFF;

/// The reset message as sent on the wire.
pub const RESET: [u8; 3] = [0xFF, 0x00, 0x00];

/// MIDI manufacturer id of TC Electronic.
pub const TC_MANUFACTURER_ID: [u8; 3] = [0x00, 0x20, 0x1F];

/// Model id of the M6000.
pub const M6000_MODEL_ID: u8 = 0x46;

/// Offset of the command byte inside a raw SysEx message.
pub const COMMAND_OFFSET: usize = 6;

/// Offset of the command payload inside a raw SysEx message.
pub const PAYLOAD_OFFSET: usize = 7;

/// `F0`, manufacturer (3), device, model, command, `F7`.
const MIN_ENVELOPE_LEN: usize = 8;

/// A complete MIDI message carried by one or more blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    Reset,
    /// Full `F0 ... F7` bytes.
    SysEx(Bytes),
}

/// The TC Electronic SysEx envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysExEnvelope {
    pub manufacturer_id: [u8; 3],
    /// Configurable on the Icon, usually 0.
    pub device_id: u8,
    pub model_id: u8,
    pub command_type: u8,
    /// Bytes between the command byte and the closing `F7`.
    pub payload: Bytes,
}

impl SysExEnvelope {
    /// Split a raw `F0 ... F7` message into its envelope fields.
    ///
    /// Only structure is checked here; see [`validate`](Self::validate) for
    /// the manufacturer and model checks.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        match (raw.first(), raw.last()) {
            (Some(&SYSEX_START), Some(&SYSEX_END)) if raw.len() >= 2 => {}
            _ => return Err(MidiError::NotSysEx),
        }
        if raw.len() < MIN_ENVELOPE_LEN {
            return Err(MidiError::EnvelopeTooShort { len: raw.len() });
        }

        Ok(Self {
            manufacturer_id: [raw[1], raw[2], raw[3]],
            device_id: raw[4],
            model_id: raw[5],
            command_type: raw[COMMAND_OFFSET],
            payload: Bytes::copy_from_slice(&raw[PAYLOAD_OFFSET..raw.len() - 1]),
        })
    }

    /// Check the manufacturer id, then the model id.
    pub fn validate(&self) -> Result<()> {
        if self.manufacturer_id != TC_MANUFACTURER_ID {
            return Err(MidiError::InvalidManufacturer(self.manufacturer_id));
        }
        if self.model_id != M6000_MODEL_ID {
            return Err(MidiError::InvalidModel(self.model_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preset_request() {
        let raw = [0xF0, 0x00, 0x20, 0x1F, 0x00, 0x46, 0x45, 0x05, 0x00, 0xF7];
        let env = SysExEnvelope::parse(&raw).unwrap();
        assert_eq!(env.manufacturer_id, TC_MANUFACTURER_ID);
        assert_eq!(env.device_id, 0);
        assert_eq!(env.model_id, M6000_MODEL_ID);
        assert_eq!(env.command_type, 0x45);
        assert_eq!(env.payload.as_ref(), &[0x05, 0x00]);
        assert!(env.validate().is_ok());
    }

    #[test]
    fn parse_empty_payload() {
        let raw = [0xF0, 0x00, 0x20, 0x1F, 0x00, 0x46, 0x46, 0xF7];
        let env = SysExEnvelope::parse(&raw).unwrap();
        assert!(env.payload.is_empty());
    }

    #[test]
    fn parse_rejects_unwrapped_bytes() {
        assert_eq!(SysExEnvelope::parse(&[]), Err(MidiError::NotSysEx));
        assert_eq!(SysExEnvelope::parse(&[0xF0]), Err(MidiError::NotSysEx));
        assert_eq!(
            SysExEnvelope::parse(&[0xF0, 0x00, 0x20]),
            Err(MidiError::NotSysEx)
        );
    }

    #[test]
    fn parse_rejects_short_envelope() {
        let raw = [0xF0, 0x00, 0x20, 0x1F, 0x46, 0xF7];
        assert_eq!(
            SysExEnvelope::parse(&raw),
            Err(MidiError::EnvelopeTooShort { len: 6 })
        );
    }

    #[test]
    fn validate_checks_manufacturer_before_model() {
        let raw = [0xF0, 0x00, 0x21, 0x1F, 0x00, 0x10, 0x45, 0xF7];
        let env = SysExEnvelope::parse(&raw).unwrap();
        assert_eq!(
            env.validate(),
            Err(MidiError::InvalidManufacturer([0x00, 0x21, 0x1F]))
        );

        let raw = [0xF0, 0x00, 0x20, 0x1F, 0x00, 0x10, 0x45, 0xF7];
        let env = SysExEnvelope::parse(&raw).unwrap();
        assert_eq!(env.validate(), Err(MidiError::InvalidModel(0x10)));
    }
}
