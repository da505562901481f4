/// Errors that can occur during block encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The block header carries a version other than 2.
    ///
    /// The framer still skips `length` payload bytes so the stream stays in
    /// sync.
    #[error("malformed block: unsupported version {version} (length {length})")]
    UnsupportedVersion { version: u16, length: usize },

    /// The payload is too large to be described by a 16-bit length.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading a raw stream.
    #[error("block I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended while a block was still incomplete.
    #[error("stream ended with {pending} bytes of an incomplete block")]
    Truncated { pending: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
