/// Errors decoding a UDP discovery datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The datagram does not start with the discovery magic. Carries the
    /// leading word that was found instead.
    #[error("not identified (no magic, found 0x{0:08x})")]
    MissingMagic(u32),

    /// The datagram ends before a fixed-offset field.
    #[error("discovery datagram too short ({actual} bytes, need {needed})")]
    TooShort { needed: usize, actual: usize },
}

/// Anything that can go wrong on one decoded unit of a session.
///
/// None of these stop the session; they are attached to the unit they
/// concern.
#[derive(Debug, thiserror::Error)]
pub enum DissectError {
    /// Block-level error (bad version, truncation).
    #[error(transparent)]
    Frame(#[from] m6kproto_frame::FrameError),

    /// MIDI or command-level error.
    #[error(transparent)]
    Midi(#[from] m6kproto_midi::MidiError),

    /// Discovery datagram error.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

pub type Result<T> = std::result::Result<T, DissectError>;
