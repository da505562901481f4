use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use m6kproto_peer::{Session, SessionConfig, TraceEvent};
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::cmd::{parse_hex, ReplayArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{MessageRow, OutputFormat, PacketRow, Printer};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Proto {
    Udp,
    Tcp,
}

/// One captured packet. Ports default to 0 and payload to empty.
#[derive(Debug, Deserialize)]
struct PacketRecord {
    seq: u64,
    proto: Proto,
    src: IpAddr,
    dst: IpAddr,
    #[serde(default)]
    src_port: u16,
    #[serde(default)]
    dst_port: u16,
    #[serde(default)]
    payload: String,
}

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file).map_err(|err| {
        io_error(&format!("cannot open {}", args.file.display()), err)
    })?;

    let mut config = SessionConfig::default().with_decoder(args.decode.decoder_config());
    if let Some(ports) = args.ignore_ports.clone() {
        config = config.with_ignored_udp_ports(ports);
    }
    let mut session = Session::new(config)
        .with_peers(args.icon, args.frame)
        .with_observer(log_event);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printer = Printer::new(format);
    let mut failed = 0usize;
    let mut last_seq = 0u64;

    for (index, line) in BufReader::new(file).lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            let dropped = session.discard_partial();
            info!(dropped, "replay interrupted");
            break;
        }

        let line = line.map_err(|err| io_error("read failed", err))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let record: PacketRecord = serde_json::from_str(line)
            .map_err(|err| CliError::data(format!("line {}: {err}", index + 1)))?;
        let payload = parse_hex(&[&record.payload])
            .map_err(|err| CliError::data(format!("line {}: {}", index + 1, err.message)))?;
        last_seq = record.seq;

        let result = match record.proto {
            Proto::Udp => session.dissect_udp(
                record.seq,
                record.src,
                record.dst,
                record.dst_port,
                &payload,
            ),
            Proto::Tcp => session.dissect_tcp(record.seq, record.src, record.dst, &payload),
        };
        if result.is_empty() {
            trace!(seq = record.seq, src_port = record.src_port, "packet skipped");
            continue;
        }

        failed += result.messages.iter().filter(|m| m.is_error()).count();
        printer.packet(&PacketRow::new(record.seq, &result, args.fields));
    }

    for report in session.finish(last_seq) {
        failed += 1;
        printer.message(&MessageRow::from(&report));
    }
    printer.finish();

    if args.strict && failed > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{failed} message(s) failed to decode"),
        ));
    }
    Ok(SUCCESS)
}

fn log_event(event: &TraceEvent<'_>) {
    match event {
        TraceEvent::Segment {
            seq,
            direction,
            payload,
        } => trace!(seq, %direction, payload = %hex::encode(payload), "segment"),
        TraceEvent::Block {
            seq,
            direction,
            block,
        } => trace!(seq, %direction, payload = %hex::encode(&block.payload), "block"),
        other => debug!(event = ?other, "session event"),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
