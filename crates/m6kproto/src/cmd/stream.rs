use std::fs::File;
use std::io::BufReader;

use m6kproto_frame::{BlockReader, Direction, FrameError};
use m6kproto_midi::{CommandDecoder, MidiMessage, SysExReassembler};
use m6kproto_peer::{MessageOutcome, MessageReport};
use tracing::debug;

use crate::cmd::StreamArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{MessageRow, OutputFormat, Printer};

/// Decode a captured one-direction byte stream. Block indices stand in for
/// packet sequence numbers.
pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file).map_err(|err| {
        io_error(&format!("cannot open {}", args.file.display()), err)
    })?;
    let direction = Direction::from(args.direction);
    let decoder = CommandDecoder::new(args.decode.decoder_config());
    let mut reassembler = SysExReassembler::new(direction);
    let mut reader = BlockReader::new(BufReader::new(file));
    let mut printer = Printer::new(format);

    let mut index = 0u64;
    // Block index the pending SysEx started at.
    let mut sysex_start = 0u64;
    let outcome = loop {
        let block = match reader.read_block() {
            Ok(Some(block)) => block,
            Ok(None) => break Ok(()),
            // A bad version is skipped like on a live stream.
            Err(err @ FrameError::UnsupportedVersion { .. }) => {
                printer.message(&MessageRow::from(&MessageReport {
                    direction,
                    start_seq: index,
                    end_seq: index,
                    outcome: MessageOutcome::Failed(err.into()),
                }));
                index += 1;
                continue;
            }
            Err(err) => break Err(frame_error("stream read failed", err)),
        };

        if reassembler.pending_len() == 0 {
            sysex_start = index;
        }
        let mut start = sysex_start;
        let message = match reassembler.push(&block.payload) {
            Ok(None) => {
                debug!(index, pending = reassembler.pending_len(), "SysEx continues");
                index += 1;
                continue;
            }
            Ok(Some(MidiMessage::Reset)) => {
                start = index;
                MessageOutcome::Reset
            }
            Ok(Some(MidiMessage::SysEx(raw))) => match decoder.decode_sysex(&raw) {
                Ok(result) => MessageOutcome::Command(result),
                Err(err) => MessageOutcome::Failed(err.into()),
            },
            Err(err) => MessageOutcome::Failed(err.into()),
        };
        printer.message(&MessageRow::from(&MessageReport {
            direction,
            start_seq: start,
            end_seq: index,
            outcome: message,
        }));
        index += 1;
    };
    printer.finish();

    outcome?;
    if reassembler.pending_len() > 0 {
        return Err(CliError::data(format!(
            "stream ended inside a SysEx ({} bytes pending)",
            reassembler.pending_len()
        )));
    }
    Ok(SUCCESS)
}
