use m6kproto_frame::Direction;
use m6kproto_midi::{CommandDecoder, CommandKind, MidiMessage, SysExReassembler};

use crate::cmd::{parse_hex, SysexArgs};
use crate::exit::{midi_error, CliError, CliResult, SUCCESS};
use crate::output::{MessageRow, OutputFormat, Printer};

pub fn run(args: SysexArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = parse_hex(&args.hex)?;
    let decoder = CommandDecoder::new(args.decode.decoder_config());

    // A lone message has no direction; the reassembler only classifies it.
    let mut reassembler = SysExReassembler::new(Direction::IconToFrame);
    let message = reassembler
        .push(&raw)
        .map_err(|err| midi_error("invalid message", err))?
        .ok_or_else(|| {
            CliError::data(format!(
                "incomplete SysEx ({} bytes, no terminating F7)",
                raw.len()
            ))
        })?;

    let row = match message {
        MidiMessage::Reset => MessageRow {
            direction: "-",
            start_seq: 0,
            end_seq: 0,
            kind: "reset",
            command_type: None,
            command_name: None,
            summary: "MIDI reset".to_string(),
        },
        MidiMessage::SysEx(bytes) => {
            let result = decoder
                .decode_sysex(&bytes)
                .map_err(|err| midi_error("decode failed", err))?;
            MessageRow {
                direction: "-",
                start_seq: 0,
                end_seq: 0,
                kind: "command",
                command_type: Some(result.command_type),
                command_name: CommandKind::from_code(result.command_type).map(CommandKind::name),
                summary: result.description,
            }
        }
    };

    let mut printer = Printer::new(format);
    printer.message(&row);
    printer.finish();
    Ok(SUCCESS)
}
