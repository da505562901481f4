//! The two bit-packing schemes used inside M6000 payloads.
//!
//! - 7-bit MIDI packing for numeric fields: two data bytes form a 14-bit
//!   value, high byte first.
//! - Nibble-pair packing for strings and bulk data: each output byte is
//!   built from two wire bytes, high nibble first.

/// How the sign bit (0x2000) of a signed 14-bit value is tested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignBitMode {
    /// Compare `value & 0x2000` against the literal `1`, as the field was
    /// first reverse-engineered. The comparison can never succeed, so
    /// values always decode as non-negative.
    #[default]
    Literal,
    /// Treat any set 0x2000 bit as the sign: clear it and negate.
    NonZero,
}

const SIGN_BIT: u16 = 0x2000;

/// Combine two MIDI data bytes into a 14-bit value.
///
/// Only the high byte is masked to 7 bits; the low byte is taken as is.
pub fn midi_14bit(hi: u8, lo: u8) -> u16 {
    ((u16::from(hi) & 0x7F) << 7) | u16::from(lo)
}

/// Combine two MIDI data bytes into a signed 14-bit value.
pub fn signed_14bit(hi: u8, lo: u8, mode: SignBitMode) -> i16 {
    let value = midi_14bit(hi, lo);
    let negative = match mode {
        // Mirrors the original bit test exactly; see `SignBitMode::Literal`.
        #[allow(clippy::bad_bit_mask)]
        SignBitMode::Literal => value & SIGN_BIT == 1,
        SignBitMode::NonZero => value & SIGN_BIT != 0,
    };
    if negative {
        -((value & !SIGN_BIT) as i16)
    } else {
        value as i16
    }
}

/// Combine the low nibbles of two wire bytes into one byte.
pub fn nibble_pair(hi: u8, lo: u8) -> u8 {
    (hi << 4) | (lo & 0x0F)
}

/// Decode a nibble-pair packed buffer, two input bytes at a time.
///
/// A trailing odd byte is ignored.
pub fn decode_nibble_pairs(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(2)
        .map(|pair| nibble_pair(pair[0], pair[1]))
        .collect()
}
