use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::codec::{decode_block, Block};
use crate::direction::Direction;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Push-based block reassembler for one direction of a TCP stream.
///
/// Segments are fed in capture order with [`push`](Self::push); bytes that
/// do not yet form a complete block stay pending until the next segment.
/// One framer per direction: the two directions never share a buffer.
#[derive(Debug)]
pub struct BlockFramer {
    direction: Direction,
    pending: BytesMut,
}

impl BlockFramer {
    /// Create an empty framer for `direction`.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Direction this framer reassembles.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Feed one TCP segment and return every block it completes, in order.
    ///
    /// A malformed block is returned as an `Err` item in place; the framer
    /// has already skipped its claimed length, so later blocks still decode.
    pub fn push(&mut self, segment: &[u8]) -> Vec<Result<Block>> {
        if !self.pending.is_empty() {
            trace!(
                direction = %self.direction,
                pending = self.pending.len(),
                segment = segment.len(),
                "resuming partial block"
            );
        }
        self.pending.extend_from_slice(segment);

        let mut out = Vec::new();
        loop {
            match decode_block(&mut self.pending) {
                Ok(Some(block)) => {
                    debug!(
                        direction = %self.direction,
                        len = block.payload.len(),
                        "block complete"
                    );
                    out.push(Ok(block));
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(direction = %self.direction, error = %err, "skipping malformed block");
                    out.push(Err(err));
                }
            }
        }

        if !self.pending.is_empty() {
            debug!(
                direction = %self.direction,
                pending = self.pending.len(),
                "incomplete block buffered for next segment"
            );
        }
        out
    }

    /// Number of bytes waiting for the rest of their block.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial block. Returns the number of bytes discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!(direction = %self.direction, dropped, "partial block discarded");
        }
        dropped
    }

    /// Signal end of stream. Reports leftover bytes as truncation and
    /// clears them.
    pub fn finish(&mut self) -> Result<()> {
        match self.discard() {
            0 => Ok(()),
            pending => Err(FrameError::Truncated { pending }),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{encode_block, BLOCK_VERSION};

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for p in payloads {
            encode_block(BLOCK_VERSION, p, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn ok_payloads(results: Vec<Result<Block>>) -> Vec<Vec<u8>> {
        results
            .into_iter()
            .map(|r| r.unwrap().payload.to_vec())
            .collect()
    }

    #[test]
    fn whole_stream_in_one_segment() {
        let mut framer = BlockFramer::new(Direction::IconToFrame);
        let out = ok_payloads(framer.push(&wire(&[b"abc", b"de"])));
        assert_eq!(out, vec![b"abc".to_vec(), b"de".to_vec()]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn split_inside_header() {
        let bytes = wire(&[&[0xFF, 0x00, 0x00]]);
        let mut framer = BlockFramer::new(Direction::FrameToIcon);

        assert!(framer.push(&bytes[..1]).is_empty());
        assert_eq!(framer.pending_len(), 1);
        assert!(framer.push(&bytes[1..3]).is_empty());
        assert_eq!(framer.pending_len(), 3);

        let out = ok_payloads(framer.push(&bytes[3..]));
        assert_eq!(out, vec![vec![0xFF, 0x00, 0x00]]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn split_inside_payload_buffers_header_too() {
        let bytes = [0x00, 0x02, 0x00, 0x05, 0xF0, 0x00, 0x20];
        let mut framer = BlockFramer::new(Direction::IconToFrame);

        assert!(framer.push(&bytes).is_empty());
        assert_eq!(framer.pending_len(), bytes.len());

        let out = ok_payloads(framer.push(&[0x1F, 0x46, 0x00, 0x02, 0x00]));
        assert_eq!(out, vec![vec![0xF0, 0x00, 0x20, 0x1F, 0x46]]);
        assert_eq!(framer.pending_len(), 3);
    }

    #[test]
    fn malformed_version_reported_and_skipped() {
        let mut bytes = vec![0x00, 0x01, 0x00, 0x02, 0xAA, 0xBB];
        bytes.extend(wire(&[b"ok"]));

        let mut framer = BlockFramer::new(Direction::IconToFrame);
        let out = framer.push(&bytes);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[0],
            Err(FrameError::UnsupportedVersion { version: 1, .. })
        ));
        assert_eq!(out[1].as_ref().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn malformed_version_with_short_body_waits() {
        let mut framer = BlockFramer::new(Direction::IconToFrame);
        assert!(framer.push(&[0x00, 0x05, 0x00, 0x04, 0x01]).is_empty());
        assert_eq!(framer.pending_len(), 5);

        let out = framer.push(&[0x02, 0x03, 0x04]);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn finish_reports_truncation() {
        let mut framer = BlockFramer::new(Direction::FrameToIcon);
        framer.push(&[0x00, 0x02, 0x00, 0x09, 0xF0]);
        let err = framer.finish().unwrap_err();
        assert!(matches!(err, FrameError::Truncated { pending: 5 }));
        assert_eq!(framer.pending_len(), 0);
        assert!(framer.finish().is_ok());
    }

    #[test]
    fn discard_clears_partial_state() {
        let mut framer = BlockFramer::new(Direction::FrameToIcon);
        framer.push(&[0x00, 0x02]);
        assert_eq!(framer.discard(), 2);
        let out = ok_payloads(framer.push(&wire(&[b"x"])));
        assert_eq!(out, vec![b"x".to_vec()]);
    }

    fn payloads_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 1..8)
    }

    proptest! {
        /// Any segmentation of a valid stream yields the same blocks as the
        /// whole stream at once.
        #[test]
        fn segmentation_does_not_change_blocks(
            payloads in payloads_strategy(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let refs: Vec<&[u8]> = payloads.iter().map(Vec::as_slice).collect();
            let bytes = wire(&refs);

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            points.push(0);
            points.push(bytes.len());
            points.sort_unstable();
            points.dedup();

            let mut framer = BlockFramer::new(Direction::IconToFrame);
            let mut got = Vec::new();
            for pair in points.windows(2) {
                got.extend(ok_payloads(framer.push(&bytes[pair[0]..pair[1]])));
            }

            let mut whole = BlockFramer::new(Direction::IconToFrame);
            let expected = ok_payloads(whole.push(&bytes));

            prop_assert_eq!(&got, &expected);
            prop_assert_eq!(got, payloads);
            prop_assert_eq!(framer.pending_len(), 0);
        }
    }
}
