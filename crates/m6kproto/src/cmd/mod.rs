use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use m6kproto_frame::Direction;
use m6kproto_midi::{DecoderConfig, SignBitMode};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod replay;
pub mod stream;
pub mod sysex;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dissect a recorded capture (JSON Lines packet records).
    Replay(ReplayArgs),
    /// Decode a single SysEx message given as hex.
    Sysex(SysexArgs),
    /// Decode a raw one-direction TCP byte stream.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Replay(args) => replay::run(args, format),
        Command::Sysex(args) => sysex::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum SignBitArg {
    /// Keep the historical test, which never reports a negative value.
    #[default]
    Literal,
    /// Treat bit 13 as a sign flag.
    NonZero,
}

impl From<SignBitArg> for SignBitMode {
    fn from(arg: SignBitArg) -> Self {
        match arg {
            SignBitArg::Literal => SignBitMode::Literal,
            SignBitArg::NonZero => SignBitMode::NonZero,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DecodeArgs {
    /// How ParamData values are signed.
    #[arg(long, value_name = "MODE", default_value = "literal")]
    pub sign_bit: SignBitArg,
}

impl DecodeArgs {
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::default().with_sign_bit(self.sign_bit.into())
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DirectionArg {
    IconToFrame,
    FrameToIcon,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::IconToFrame => Direction::IconToFrame,
            DirectionArg::FrameToIcon => Direction::FrameToIcon,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file, one JSON packet record per line.
    pub file: PathBuf,
    /// Icon address, if known in advance.
    #[arg(long, value_name = "IP", env = "M6KPROTO_ICON")]
    pub icon: Option<IpAddr>,
    /// Frame address, if known in advance.
    #[arg(long, value_name = "IP", env = "M6KPROTO_FRAME", requires = "icon")]
    pub frame: Option<IpAddr>,
    /// UDP destination ports to skip (comma-separated). Default: 137,138.
    #[arg(long, value_delimiter = ',')]
    pub ignore_ports: Option<Vec<u16>>,
    /// Print field descriptors with each packet.
    #[arg(long)]
    pub fields: bool,
    /// Exit with 60 if any message failed to decode.
    #[arg(long)]
    pub strict: bool,
    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Args, Debug)]
pub struct SysexArgs {
    /// Message bytes as hex; whitespace is ignored.
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Raw stream file (concatenated blocks).
    pub file: PathBuf,
    /// Direction the stream was captured in.
    #[arg(long, value_name = "DIR", default_value = "icon-to-frame")]
    pub direction: DirectionArg,
    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex that may be split over arguments or contain spaces.
pub fn parse_hex<S: AsRef<str>>(parts: &[S]) -> CliResult<Vec<u8>> {
    let digits: String = parts
        .iter()
        .flat_map(|p| p.as_ref().chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits).map_err(|err| CliError::usage(format!("invalid hex: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_ignores_whitespace() {
        assert_eq!(
            parse_hex(&["F0 00 20", "1f"]).unwrap(),
            vec![0xF0, 0x00, 0x20, 0x1F]
        );
    }

    #[test]
    fn odd_hex_is_usage_error() {
        let err = parse_hex(&["F0 0"]).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn sign_bit_maps() {
        let args = DecodeArgs {
            sign_bit: SignBitArg::NonZero,
        };
        assert_eq!(args.decoder_config().sign_bit, SignBitMode::NonZero);
    }
}
