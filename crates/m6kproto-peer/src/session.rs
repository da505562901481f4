use std::fmt;
use std::net::IpAddr;

use m6kproto_frame::{BlockFramer, Direction, FrameError};
use m6kproto_midi::{
    CommandDecoder, CommandResult, DecoderConfig, MidiMessage, SysExEnvelope, SysExReassembler,
};
use tracing::{debug, info, trace, warn};

use crate::discovery::{decode_discovery, has_magic, DiscoveryKind};
use crate::error::DissectError;
use crate::fields::{block_fields, FieldDescriptor, FieldId};
use crate::identity::{Observation, PeerIdentifier, PeerIdentity, Route};
use crate::observer::{Observer, TraceEvent};

/// TCP port the Frame accepts command connections on.
pub const COMMAND_TCP_PORT: u16 = 1026;

/// UDP port discovery datagrams are sent to.
pub const DISCOVERY_UDP_PORT: u16 = 17;

/// NetBIOS name and datagram services.
pub const NETBIOS_PORTS: [u16; 2] = [137, 138];

pub const UDP_PROTOCOL: &str = "TC Discovery";
pub const TCP_PROTOCOL: &str = "TC Proto";

const UNIDENTIFIED: &str = "peer not yet identified";
const NO_MAGIC: &str = "not identified (no magic)";
const UNRELATED: &str = "unrelated traffic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub decoder: DecoderConfig,
    /// UDP destination ports that are never dissected.
    pub ignored_udp_ports: Vec<u16>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            ignored_udp_ports: NETBIOS_PORTS.to_vec(),
        }
    }
}

impl SessionConfig {
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_ignored_udp_ports(mut self, ports: Vec<u16>) -> Self {
        self.ignored_udp_ports = ports;
        self
    }
}

/// What a complete unit on the TCP stream turned out to be.
#[derive(Debug)]
pub enum MessageOutcome {
    Reset,
    Command(CommandResult),
    Failed(DissectError),
}

/// One complete message (or one error) from a TCP direction.
///
/// `start_seq` is the packet in which the first byte of the message was
/// seen, `end_seq` the one that completed it.
#[derive(Debug)]
pub struct MessageReport {
    pub direction: Direction,
    pub start_seq: u64,
    pub end_seq: u64,
    pub outcome: MessageOutcome,
}

impl MessageReport {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, MessageOutcome::Failed(_))
    }
}

impl fmt::Display for MessageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            MessageOutcome::Reset => f.write_str("MIDI reset"),
            MessageOutcome::Command(result) => f.write_str(&result.description),
            MessageOutcome::Failed(err) => write!(f, "error: {err}"),
        }
    }
}

/// Everything the host needs to annotate one packet.
#[derive(Debug, Default)]
pub struct DissectResult {
    pub protocol: &'static str,
    pub direction: Option<Direction>,
    /// One-line summary.
    pub info: String,
    pub fields: Vec<FieldDescriptor>,
    /// Messages completed by this packet. TCP only.
    pub messages: Vec<MessageReport>,
}

impl DissectResult {
    fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }

    /// Nothing to show, e.g. an ignored port.
    pub fn is_empty(&self) -> bool {
        self.protocol.is_empty() && self.info.is_empty() && self.messages.is_empty()
    }
}

struct Stream {
    framer: BlockFramer,
    sysex: SysExReassembler,
    /// Packet holding the first byte of the partial block, if any.
    block_start: Option<u64>,
    /// Packet holding the first byte of the partial SysEx, if any.
    sysex_start: Option<u64>,
}

impl Stream {
    fn new(direction: Direction) -> Self {
        Self {
            framer: BlockFramer::new(direction),
            sysex: SysExReassembler::new(direction),
            block_start: None,
            sysex_start: None,
        }
    }

    /// Feed one block payload that started in packet `block_seq`. Returns
    /// the packet the resulting message (if any) started in.
    fn reassemble(
        &mut self,
        payload: &[u8],
        block_seq: u64,
    ) -> (u64, m6kproto_midi::Result<Option<MidiMessage>>) {
        let start = match self.sysex_start {
            Some(start) if self.sysex.pending_len() > 0 => start,
            _ => block_seq,
        };
        let out = self.sysex.push(payload);
        self.sysex_start = (self.sysex.pending_len() > 0).then_some(start);
        match out {
            // A reset stands alone even when it cut a partial SysEx short.
            Ok(Some(MidiMessage::Reset)) => (block_seq, out),
            _ => (start, out),
        }
    }

    fn clear(&mut self) -> (usize, usize) {
        self.block_start = None;
        self.sysex_start = None;
        (self.framer.discard(), self.sysex.discard())
    }
}

/// Dissection state for one capture.
///
/// Holds the peer identity plus one framer and one reassembler per
/// direction. Feed packets in capture order.
pub struct Session {
    config: SessionConfig,
    identifier: PeerIdentifier,
    decoder: CommandDecoder,
    streams: [Stream; 2],
    observer: Option<Box<dyn Observer + Send>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("identity", &self.identifier.identity())
            .field("pending", &self.pending_bytes())
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            decoder: CommandDecoder::new(config.decoder),
            config,
            identifier: PeerIdentifier::new(),
            streams: Direction::ALL.map(Stream::new),
            observer: None,
        }
    }

    /// Pre-seed the peer addresses instead of waiting for discovery.
    pub fn with_peers(mut self, icon: Option<IpAddr>, frame: Option<IpAddr>) -> Self {
        self.identifier = PeerIdentifier::with_addresses(icon, frame);
        self
    }

    pub fn with_observer(mut self, observer: impl Observer + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn identity(&self) -> PeerIdentity {
        self.identifier.identity()
    }

    /// Bytes buffered across both directions.
    pub fn pending_bytes(&self) -> usize {
        self.streams
            .iter()
            .map(|s| s.framer.pending_len() + s.sysex.pending_len())
            .sum()
    }

    /// Dissect one UDP datagram.
    pub fn dissect_udp(
        &mut self,
        seq: u64,
        src: IpAddr,
        dst: IpAddr,
        dst_port: u16,
        payload: &[u8],
    ) -> DissectResult {
        if self.config.ignored_udp_ports.contains(&dst_port) {
            trace!(seq, dst_port, "udp port ignored");
            return DissectResult::default();
        }

        let mut result = DissectResult::new(UDP_PROTOCOL);
        if !has_magic(payload) {
            trace!(seq, len = payload.len(), "udp without discovery magic");
            result.info = NO_MAGIC.to_string();
            return result;
        }

        let observation = self.identifier.observe_udp(src, dst, payload);
        self.notify_identity(observation);

        let route = self.identifier.classify(src, dst);
        result.direction = route.direction();
        let kind = match route {
            Route::FrameToIcon => DiscoveryKind::ProbeResponse,
            Route::IconToFrame => DiscoveryKind::IconCommand,
            Route::IconBroadcast => DiscoveryKind::IconBroadcast,
            Route::Unidentified | Route::Unrelated => {
                result.info = unrouted(route).to_string();
                result.fields = vec![magic_field()];
                return result;
            }
        };

        match decode_discovery(kind, payload) {
            Ok(decoded) => {
                result.info = decoded.message.to_string();
                result.fields = decoded.fields;
            }
            Err(err) => {
                warn!(seq, error = %err, "discovery datagram not decoded");
                result.info = err.to_string();
                result.fields = vec![magic_field()];
            }
        }
        result
    }

    /// Dissect one TCP segment.
    pub fn dissect_tcp(
        &mut self,
        seq: u64,
        src: IpAddr,
        dst: IpAddr,
        payload: &[u8],
    ) -> DissectResult {
        let observation = self.identifier.observe_packet(src, dst);
        self.notify_identity(observation);

        let mut result = DissectResult::new(TCP_PROTOCOL);
        let route = self.identifier.classify(src, dst);
        let Some(direction) = route.direction() else {
            result.info = unrouted(route).to_string();
            return result;
        };
        result.direction = Some(direction);

        if payload.is_empty() {
            result.info = "no payload".to_string();
            return result;
        }

        let stream = &mut self.streams[direction.index()];
        if stream.framer.pending_len() == 0 {
            result.fields = block_fields(payload);
        }
        notify(
            &mut self.observer,
            &TraceEvent::Segment {
                seq,
                direction,
                payload,
            },
        );

        let mut block_seq = stream.block_start.unwrap_or(seq);
        for item in stream.framer.push(payload) {
            let mut start_seq = block_seq;
            let outcome = match item {
                Ok(block) => {
                    notify(
                        &mut self.observer,
                        &TraceEvent::Block {
                            seq,
                            direction,
                            block: &block,
                        },
                    );
                    let (message_start, out) = stream.reassemble(&block.payload, block_seq);
                    start_seq = message_start;
                    match out {
                        Ok(None) => {
                            block_seq = seq;
                            continue;
                        }
                        Ok(Some(message)) => {
                            notify(
                                &mut self.observer,
                                &TraceEvent::Message {
                                    seq,
                                    direction,
                                    message: &message,
                                },
                            );
                            decode_message(&self.decoder, &message)
                        }
                        Err(err) => MessageOutcome::Failed(err.into()),
                    }
                }
                Err(err) => MessageOutcome::Failed(err.into()),
            };

            if let MessageOutcome::Failed(err) = &outcome {
                warn!(seq, %direction, error = %err, "message not decoded");
            }
            result.messages.push(MessageReport {
                direction,
                start_seq,
                end_seq: seq,
                outcome,
            });
            block_seq = seq;
        }
        stream.block_start = (stream.framer.pending_len() > 0).then_some(block_seq);

        result.info = if !result.messages.is_empty() {
            result
                .messages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | ")
        } else if stream.framer.pending_len() > 0 {
            format!("partial block ({} bytes buffered)", stream.framer.pending_len())
        } else {
            format!("partial SysEx ({} bytes buffered)", stream.sysex.pending_len())
        };
        debug!(seq, %direction, info = %result.info, "tcp segment dissected");
        result
    }

    /// Drop every partially received block and SysEx message.
    ///
    /// Used when a capture is cancelled or the host signals a gap.
    /// Returns the number of bytes dropped.
    pub fn discard_partial(&mut self) -> usize {
        let mut dropped = 0;
        for (direction, stream) in Direction::ALL.into_iter().zip(self.streams.iter_mut()) {
            let (block_bytes, sysex_bytes) = stream.clear();
            if block_bytes + sysex_bytes > 0 {
                info!(%direction, block_bytes, sysex_bytes, "partial state discarded");
                notify(
                    &mut self.observer,
                    &TraceEvent::PartialDiscarded {
                        direction,
                        block_bytes,
                        sysex_bytes,
                    },
                );
            }
            dropped += block_bytes + sysex_bytes;
        }
        dropped
    }

    /// End of capture. Reports every direction that stopped mid block,
    /// then clears all partial state.
    pub fn finish(&mut self, seq: u64) -> Vec<MessageReport> {
        let mut reports = Vec::new();
        for (direction, stream) in Direction::ALL.into_iter().zip(self.streams.iter_mut()) {
            if let Err(err) = stream.framer.finish() {
                reports.push(MessageReport {
                    direction,
                    start_seq: stream.block_start.unwrap_or(seq),
                    end_seq: seq,
                    outcome: MessageOutcome::Failed(err.into()),
                });
            } else if stream.sysex.pending_len() > 0 {
                let pending = stream.sysex.pending_len();
                reports.push(MessageReport {
                    direction,
                    start_seq: stream.sysex_start.unwrap_or(seq),
                    end_seq: seq,
                    outcome: MessageOutcome::Failed(FrameError::Truncated { pending }.into()),
                });
            }
        }
        self.discard_partial();
        reports
    }

    fn notify_identity(&mut self, observation: Observation) {
        let event = match observation {
            Observation::IconIdentified(icon) => TraceEvent::IconIdentified { icon },
            Observation::FrameIdentified(frame) => TraceEvent::FrameIdentified { frame },
            Observation::Ignored | Observation::Unchanged => return,
        };
        notify(&mut self.observer, &event);
    }
}

fn notify(observer: &mut Option<Box<dyn Observer + Send>>, event: &TraceEvent<'_>) {
    if let Some(observer) = observer.as_mut() {
        observer.on_event(event);
    }
}

fn decode_message(decoder: &CommandDecoder, message: &MidiMessage) -> MessageOutcome {
    match message {
        MidiMessage::Reset => MessageOutcome::Reset,
        MidiMessage::SysEx(raw) => {
            match SysExEnvelope::parse(raw).and_then(|envelope| decoder.decode(&envelope)) {
                Ok(result) => MessageOutcome::Command(result),
                Err(err) => MessageOutcome::Failed(err.into()),
            }
        }
    }
}

fn unrouted(route: Route) -> &'static str {
    match route {
        Route::Unidentified => UNIDENTIFIED,
        _ => UNRELATED,
    }
}

fn magic_field() -> FieldDescriptor {
    FieldDescriptor::new(FieldId::DiscoveryMagic, 0, 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use m6kproto_midi::{Command, MidiError};
    use proptest::prelude::*;
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Mutex};

    const ICON: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10));
    const FRAME: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
    const BCAST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255));

    const PARAM_REQUEST: [u8; 14] = [
        0xF0, 0x00, 0x20, 0x1F, 0x00, 0x46, 0x47, 0x06, 0x0b, 0x00, 0x16, 0x01, 0x04, 0xF7,
    ];

    fn block(payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0x00, 0x02];
        v.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    fn icon_broadcast() -> Vec<u8> {
        let mut p = vec![0x12, 0x34, 0x56, 0x78];
        p.extend_from_slice(b"TCIcon\0\0\0\0\0\0");
        p.extend_from_slice(&[0x01, 0x02]);
        p
    }

    fn identified() -> Session {
        Session::default().with_peers(Some(ICON), Some(FRAME))
    }

    #[test]
    fn discovery_identifies_peers() {
        let mut session = Session::default();
        let res = session.dissect_udp(1, ICON, BCAST, DISCOVERY_UDP_PORT, &icon_broadcast());
        assert_eq!(res.protocol, "TC Discovery");
        assert_eq!(res.info, "Icon broadcast 'TCIcon' (2 trailer bytes)");
        assert_eq!(session.identity().icon, Some(ICON));

        let mut reply = vec![0u8; 0x60];
        reply[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        let res = session.dissect_udp(2, FRAME, ICON, DISCOVERY_UDP_PORT, &reply);
        assert_eq!(res.direction, Some(Direction::FrameToIcon));
        assert!(res.info.starts_with("Frame probe response"));
        assert_eq!(session.identity().frame, Some(FRAME));
    }

    #[test]
    fn udp_without_magic() {
        let mut session = Session::default();
        let res = session.dissect_udp(1, ICON, BCAST, DISCOVERY_UDP_PORT, &[0u8; 32]);
        assert_eq!(res.info, "not identified (no magic)");
        assert_eq!(session.identity(), PeerIdentity::default());
    }

    #[test]
    fn netbios_is_ignored() {
        let mut session = Session::default();
        let res = session.dissect_udp(1, ICON, BCAST, 137, &icon_broadcast());
        assert!(res.is_empty());
        assert!(!session.identity().is_identified());
    }

    #[test]
    fn tcp_before_identification() {
        let mut session = Session::default();
        let res = session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST));
        assert_eq!(res.info, "peer not yet identified");
        assert!(res.messages.is_empty());
        assert_eq!(session.pending_bytes(), 0);
    }

    #[test]
    fn tcp_frame_learned_from_reply() {
        let mut session = Session::default().with_peers(Some(ICON), None);
        session.dissect_tcp(1, FRAME, ICON, &[]);
        assert_eq!(session.identity().frame, Some(FRAME));
    }

    #[test]
    fn split_header_and_body_spans_packets() {
        let mut session = identified();
        let wire = block(&PARAM_REQUEST);

        let res = session.dissect_tcp(10, ICON, FRAME, &wire[..3]);
        assert!(res.messages.is_empty());
        assert!(res.info.starts_with("partial block"));

        let res = session.dissect_tcp(11, ICON, FRAME, &wire[3..9]);
        assert!(res.messages.is_empty());

        let res = session.dissect_tcp(12, ICON, FRAME, &wire[9..]);
        assert_eq!(res.messages.len(), 1);
        let report = &res.messages[0];
        assert_eq!((report.start_seq, report.end_seq), (10, 12));
        assert_eq!(report.direction, Direction::IconToFrame);
        let MessageOutcome::Command(result) = &report.outcome else {
            panic!("expected command");
        };
        assert!(matches!(
            result.command,
            Command::ParamRequest { count: 0x84, .. }
        ));
        assert_eq!(session.pending_bytes(), 0);
    }

    #[test]
    fn sysex_split_across_blocks() {
        let mut session = identified();
        let res = session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST[..5]));
        assert!(res.info.starts_with("partial SysEx"));

        // Traffic the other way does not disturb the pending message.
        let res = session.dissect_tcp(2, FRAME, ICON, &block(&[0xFF, 0x00, 0x00]));
        assert!(matches!(res.messages[0].outcome, MessageOutcome::Reset));

        let res = session.dissect_tcp(3, ICON, FRAME, &block(&PARAM_REQUEST[5..]));
        assert_eq!(res.messages.len(), 1);
        assert_eq!(res.messages[0].start_seq, 1);
        assert!(matches!(
            res.messages[0].outcome,
            MessageOutcome::Command(_)
        ));
    }

    #[test]
    fn envelope_without_device_byte_reassembles() {
        let mut session = identified();
        let res = session.dissect_tcp(
            1,
            ICON,
            FRAME,
            &[0x00, 0x02, 0x00, 0x05, 0xF0, 0x00, 0x20, 0x1F, 0x46],
        );
        assert!(res.messages.is_empty());

        let res = session.dissect_tcp(2, ICON, FRAME, &[0x00, 0x02, 0x00, 0x03, 0x47, 0x00, 0xF7]);
        assert_eq!(res.messages.len(), 1);
        assert_eq!((res.messages[0].start_seq, res.messages[0].end_seq), (1, 2));
        // Without a device id byte the model lands on 0x47.
        assert!(matches!(
            res.messages[0].outcome,
            MessageOutcome::Failed(DissectError::Midi(MidiError::InvalidModel(0x47)))
        ));
    }

    #[test]
    fn several_blocks_in_one_segment() {
        let mut session = identified();
        let mut wire = block(&[0xFF, 0x00, 0x00]);
        wire.extend(block(&PARAM_REQUEST));
        let res = session.dissect_tcp(4, ICON, FRAME, &wire);
        assert_eq!(res.messages.len(), 2);
        assert!(res.info.starts_with("MIDI reset | Param request"));
        assert!(res
            .fields
            .iter()
            .any(|f| f.field == FieldId::MessageType && f.offset == 7 + 4 + 6));
    }

    #[test]
    fn bad_version_is_reported_and_stream_continues() {
        let mut session = identified();
        let mut wire = vec![0x00, 0x03, 0x00, 0x01, 0x00];
        wire.extend(block(&[0xFF, 0x00, 0x00]));
        let res = session.dissect_tcp(1, ICON, FRAME, &wire);
        assert_eq!(res.messages.len(), 2);
        assert!(matches!(
            res.messages[0].outcome,
            MessageOutcome::Failed(DissectError::Frame(FrameError::UnsupportedVersion {
                version: 3,
                ..
            }))
        ));
        assert!(matches!(res.messages[1].outcome, MessageOutcome::Reset));
    }

    #[test]
    fn bad_block_inside_sysex_keeps_message_start() {
        let mut session = identified();
        let res = session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST[..2]));
        assert!(res.messages.is_empty());

        let res = session.dissect_tcp(2, ICON, FRAME, &[0x00, 0x03, 0x00, 0x01, 0x00]);
        assert_eq!(res.messages.len(), 1);
        assert_eq!((res.messages[0].start_seq, res.messages[0].end_seq), (2, 2));
        assert!(res.messages[0].is_error());

        let res = session.dissect_tcp(3, ICON, FRAME, &block(&PARAM_REQUEST[2..]));
        assert_eq!(res.messages.len(), 1);
        assert_eq!((res.messages[0].start_seq, res.messages[0].end_seq), (1, 3));
        assert!(matches!(
            res.messages[0].outcome,
            MessageOutcome::Command(_)
        ));
    }

    #[test]
    fn reset_mid_sysex_starts_in_its_own_packet() {
        let mut session = identified();
        session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST[..5]));
        let res = session.dissect_tcp(2, ICON, FRAME, &block(&[0xFF, 0x00, 0x00]));
        let reset = res
            .messages
            .iter()
            .find(|m| matches!(m.outcome, MessageOutcome::Reset))
            .unwrap();
        assert_eq!((reset.start_seq, reset.end_seq), (2, 2));
    }

    #[test]
    fn foreign_manufacturer_is_an_error() {
        let mut session = identified();
        let raw = [0xF0, 0x41, 0x10, 0x42, 0x00, 0x46, 0x47, 0xF7];
        let res = session.dissect_tcp(1, ICON, FRAME, &block(&raw));
        assert!(res.messages[0].is_error());
        assert!(matches!(
            res.messages[0].outcome,
            MessageOutcome::Failed(DissectError::Midi(MidiError::InvalidManufacturer(_)))
        ));
    }

    #[test]
    fn discard_partial_resets_streams() {
        let mut session = identified();
        session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST[..5]));
        session.dissect_tcp(2, FRAME, ICON, &[0x00, 0x02]);
        assert_eq!(session.pending_bytes(), 5 + 2);

        assert_eq!(session.discard_partial(), 7);
        assert_eq!(session.pending_bytes(), 0);

        let res = session.dissect_tcp(3, ICON, FRAME, &block(&PARAM_REQUEST));
        assert_eq!(res.messages[0].start_seq, 3);
        assert!(!res.messages[0].is_error());
    }

    #[test]
    fn finish_reports_truncation() {
        let mut session = identified();
        session.dissect_tcp(1, ICON, FRAME, &block(&PARAM_REQUEST)[..6]);
        let reports = session.finish(2);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].start_seq, 1);
        assert!(matches!(
            reports[0].outcome,
            MessageOutcome::Failed(DissectError::Frame(FrameError::Truncated { pending: 6 }))
        ));
        assert_eq!(session.pending_bytes(), 0);
    }

    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session>();
    }

    #[test]
    fn observer_sees_pipeline() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut session = Session::default().with_observer(move |event: &TraceEvent<'_>| {
            let name = match event {
                TraceEvent::IconIdentified { .. } => "icon",
                TraceEvent::FrameIdentified { .. } => "frame",
                TraceEvent::Segment { .. } => "segment",
                TraceEvent::Block { .. } => "block",
                TraceEvent::Message { .. } => "message",
                TraceEvent::PartialDiscarded { .. } => "discarded",
            };
            sink.lock().unwrap().push(name);
        });

        session.dissect_udp(1, ICON, BCAST, DISCOVERY_UDP_PORT, &icon_broadcast());
        session.dissect_tcp(2, FRAME, ICON, &block(&[0xFF, 0x00, 0x00]));
        session.dissect_tcp(3, ICON, FRAME, &[0x00]);
        session.discard_partial();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "icon",
                "frame",
                "segment",
                "block",
                "message",
                "segment",
                "discarded"
            ]
        );
    }

    proptest! {
        #[test]
        fn arbitrary_segments_never_panic(
            segments in prop::collection::vec(
                (any::<bool>(), prop::collection::vec(any::<u8>(), 0..64)),
                0..16,
            )
        ) {
            let mut session = identified();
            for (seq, (from_icon, payload)) in segments.iter().enumerate() {
                let (src, dst) = if *from_icon { (ICON, FRAME) } else { (FRAME, ICON) };
                let res = session.dissect_tcp(seq as u64, src, dst, payload);
                for report in &res.messages {
                    prop_assert!(report.start_seq <= report.end_seq);
                }
            }
            let last = segments.len() as u64;
            for report in session.finish(last) {
                prop_assert!(report.is_error());
            }
            prop_assert_eq!(session.pending_bytes(), 0);
        }
    }
}
