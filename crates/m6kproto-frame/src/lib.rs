//! Length-prefixed block framing for the TC M6000 control stream.
//!
//! The Icon and the Frame exchange MIDI messages over TCP wrapped in blocks:
//! - A 2-byte big-endian block version (always 2)
//! - A 2-byte big-endian payload length
//! - `length` bytes of payload
//!
//! TCP segmentation is arbitrary, so a block header or body may straddle
//! several segments. [`BlockFramer`] buffers per direction until a whole
//! block is available.

pub mod codec;
pub mod direction;
pub mod error;
pub mod framer;
pub mod reader;

pub use codec::{decode_block, encode_block, Block, BLOCK_VERSION, HEADER_SIZE, MAX_PAYLOAD};
#[cfg(feature = "async")]
pub use codec::BlockCodec;
pub use direction::Direction;
pub use error::{FrameError, Result};
pub use framer::BlockFramer;
pub use reader::BlockReader;
