use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Block header: version (2) + length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// The only block version seen on the wire.
pub const BLOCK_VERSION: u16 = 2;

/// Largest payload a 16-bit length can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// A length-prefixed unit of the TCP control stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block version from the header.
    pub version: u16,
    /// The block payload (usually a MIDI message or a piece of one).
    pub payload: Bytes,
}

impl Block {
    /// Create a new block.
    pub fn new(version: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            version,
            payload: payload.into(),
        }
    }

    /// The total wire size of this block (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a block into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┐
/// │ Version (2B) │ Length (2B)  │ Payload          │
/// │ BE, = 2      │ BE           │ (Length bytes)   │
/// └──────────────┴──────────────┴──────────────────┘
/// ```
pub fn encode_block(version: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u16(version);
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a block from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete block yet; in
/// that case nothing is consumed, so the header is re-read once more bytes
/// arrive. A complete block with a version other than [`BLOCK_VERSION`] is
/// consumed and reported as [`FrameError::UnsupportedVersion`].
pub fn decode_block(src: &mut BytesMut) -> Result<Option<Block>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let version = u16::from_be_bytes([src[0], src[1]]);
    let length = u16::from_be_bytes([src[2], src[3]]) as usize;

    if src.len() < HEADER_SIZE + length {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(length).freeze();

    if version != BLOCK_VERSION {
        return Err(FrameError::UnsupportedVersion { version, length });
    }

    Ok(Some(Block { version, payload }))
}

/// `tokio_util` codec for live TCP streams.
///
/// Malformed blocks are yielded as `Err` items instead of terminating the
/// stream.
#[cfg(feature = "async")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockCodec;

#[cfg(feature = "async")]
impl tokio_util::codec::Decoder for BlockCodec {
    type Item = Result<Block>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        match decode_block(src) {
            Ok(Some(block)) => Ok(Some(Ok(block))),
            Ok(None) => Ok(None),
            Err(err @ FrameError::UnsupportedVersion { .. }) => Ok(Some(Err(err))),
            Err(err) => Err(err),
        }
    }

    fn decode_eof(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if src.is_empty() => Ok(None),
            None => {
                let pending = src.len();
                src.clear();
                Err(FrameError::Truncated { pending })
            }
        }
    }
}
