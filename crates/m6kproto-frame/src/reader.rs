use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_block, Block};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete blocks from any `Read` stream holding one direction of
/// the control stream (a raw dump, a socket, ...).
///
/// Handles partial reads internally; callers always get complete blocks.
pub struct BlockReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> BlockReader<T> {
    /// Create a new block reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next block (blocking).
    ///
    /// Returns `Ok(None)` at a clean end of stream and
    /// `Err(FrameError::Truncated)` if the stream stops mid block. A block
    /// with a bad version is consumed and returned as an error; the next
    /// call continues after it.
    pub fn read_block(&mut self) -> Result<Option<Block>> {
        loop {
            if let Some(block) = decode_block(&mut self.buf)? {
                return Ok(Some(block));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let pending = self.buf.len();
                self.buf.clear();
                return Err(FrameError::Truncated { pending });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for BlockReader<T> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_block().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_block, BLOCK_VERSION};

    #[test]
    fn read_multiple_blocks() {
        let mut wire = BytesMut::new();
        encode_block(BLOCK_VERSION, b"one", &mut wire).unwrap();
        encode_block(BLOCK_VERSION, b"two", &mut wire).unwrap();

        let mut reader = BlockReader::new(Cursor::new(wire.to_vec()));
        assert_eq!(reader.read_block().unwrap().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_block().unwrap().unwrap().payload.as_ref(), b"two");
        assert!(reader.read_block().unwrap().is_none());
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_block(BLOCK_VERSION, &[0xF0, 0x00, 0xF7], &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = BlockReader::new(byte_reader);
        let block = reader.read_block().unwrap().unwrap();
        assert_eq!(block.payload.as_ref(), &[0xF0, 0x00, 0xF7]);
    }

    #[test]
    fn stream_closed_mid_block() {
        let mut reader = BlockReader::new(Cursor::new(vec![0x00, 0x02, 0x00, 0x10, 0xF0]));
        let err = reader.read_block().unwrap_err();
        assert!(matches!(err, FrameError::Truncated { pending: 5 }));
    }

    #[test]
    fn bad_version_then_recovers() {
        let mut wire = BytesMut::new();
        encode_block(4, b"zz", &mut wire).unwrap();
        encode_block(BLOCK_VERSION, b"ok", &mut wire).unwrap();

        let items: Vec<_> = BlockReader::new(Cursor::new(wire.to_vec())).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0],
            Err(FrameError::UnsupportedVersion { version: 4, .. })
        ));
        assert_eq!(items[1].as_ref().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_block(BLOCK_VERSION, b"ok", &mut wire).unwrap();

        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire.to_vec()),
        };
        let mut blocks = BlockReader::new(reader);
        assert_eq!(blocks.read_block().unwrap().unwrap().payload.as_ref(), b"ok");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
