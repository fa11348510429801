//! Datagram framing for snapshots.
//!
//! A snapshot of a full universe does not fit one UDP datagram, so the sender cuts it
//! into frames of at most `MAX_FRAME_BYTES` encoded bytes. Every frame repeats the
//! snapshot's `taken_at` and carries its index and the frame count; the receiver
//! keeps one snapshot in flight and hands it out once every part has arrived.
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::quote::{QuoteState, Snapshot};

/// Upper bound on one encoded frame.
pub const MAX_FRAME_BYTES: usize = 8 * 1024;
/// Room reserved for the frame envelope around the quotes.
const FRAME_OVERHEAD: usize = 128;

/// One datagram-sized slice of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFrame {
    /// `taken_at` of the snapshot this frame belongs to.
    pub taken_at: i64,
    /// Zero-based index of this frame.
    pub part: u16,
    /// Number of frames the snapshot was cut into.
    pub parts: u16,
    /// Quotes of this slice, in snapshot order.
    pub quotes: Vec<QuoteState>,
}

impl SnapshotFrame {
    /// Cut `snapshot` into frames whose encoding stays within `max_bytes`.
    ///
    /// An empty snapshot still yields one (empty) frame so receivers see every tick.
    pub fn split(snapshot: &Snapshot, max_bytes: usize) -> Result<Vec<SnapshotFrame>, FeedError> {
        let budget = max_bytes.saturating_sub(FRAME_OVERHEAD);
        let mut groups: Vec<Vec<QuoteState>> = Vec::new();
        let mut current = Vec::new();
        let mut used = 0;
        for quote in &snapshot.quotes {
            // +1 for the separating comma.
            let size = serde_json::to_vec(quote)?.len() + 1;
            if !current.is_empty() && used + size > budget {
                groups.push(std::mem::take(&mut current));
                used = 0;
            }
            used += size;
            current.push(quote.clone());
        }
        if !current.is_empty() || groups.is_empty() {
            groups.push(current);
        }

        let parts = u16::try_from(groups.len())
            .map_err(|_| FeedError::Format(format!("snapshot needs {} frames", groups.len())))?;
        Ok(groups
            .into_iter()
            .zip(0..parts)
            .map(|(quotes, part)| SnapshotFrame {
                taken_at: snapshot.taken_at,
                part,
                parts,
                quotes,
            })
            .collect())
    }

    /// Encode the frame to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, FeedError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a frame from a JSON datagram.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, FeedError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reassembles frames into snapshots.
///
/// Only one snapshot is in flight: a frame with a different `taken_at` or frame count
/// drops whatever was collected so far. A lost frame therefore costs one tick, never
/// more.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    taken_at: i64,
    slots: Vec<Option<Vec<QuoteState>>>,
    received: usize,
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `frame`; returns the snapshot once its last missing frame arrives.
    pub fn push(&mut self, frame: SnapshotFrame) -> Option<Snapshot> {
        let parts = usize::from(frame.parts);
        let part = usize::from(frame.part);
        if part >= parts {
            return None;
        }
        if frame.taken_at != self.taken_at || self.slots.len() != parts {
            self.taken_at = frame.taken_at;
            self.slots = vec![None; parts];
            self.received = 0;
        }

        let slot = &mut self.slots[part];
        if slot.is_none() {
            self.received += 1;
        }
        *slot = Some(frame.quotes);
        if self.received < parts {
            return None;
        }

        let quotes = self.slots.drain(..).flatten().flatten().collect();
        self.received = 0;
        Some(Snapshot {
            taken_at: self.taken_at,
            quotes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(count: usize) -> Snapshot {
        let quotes = (0..count)
            .map(|i| QuoteState {
                symbol: format!("SYM{:04}", i),
                price: 100.0 + i as f64 / 7.0,
                change_percent: -(i as f64) / 3.0,
                is_live: i % 3 == 0,
                is_priority: i < 50,
            })
            .collect();
        Snapshot {
            taken_at: 1_700_000_000_000,
            quotes,
        }
    }

    fn symbols(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.quotes.iter().map(|q| q.symbol.as_str()).collect()
    }

    #[test]
    fn large_snapshots_split_into_bounded_frames() {
        let original = snapshot(1000);
        let frames = SnapshotFrame::split(&original, MAX_FRAME_BYTES).unwrap();
        assert!(frames.len() > 1);
        for (index, frame) in frames.iter().enumerate() {
            assert_eq!(usize::from(frame.part), index);
            assert_eq!(usize::from(frame.parts), frames.len());
            assert_eq!(frame.taken_at, original.taken_at);
            assert!(frame.to_json_bytes().unwrap().len() <= MAX_FRAME_BYTES);
        }
        let total: usize = frames.iter().map(|f| f.quotes.len()).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn empty_snapshot_still_yields_a_frame() {
        let frames = SnapshotFrame::split(&snapshot(0), MAX_FRAME_BYTES).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].parts, 1);

        let mut assembler = FrameAssembler::new();
        let assembled = assembler.push(frames[0].clone()).unwrap();
        assert!(assembled.quotes.is_empty());
    }

    #[test]
    fn out_of_order_frames_reassemble_in_snapshot_order() {
        let original = snapshot(400);
        let mut frames = SnapshotFrame::split(&original, 4096).unwrap();
        assert!(frames.len() >= 3);
        frames.reverse();

        let mut assembler = FrameAssembler::new();
        let last = frames.pop().unwrap();
        for frame in frames {
            assert!(assembler.push(frame).is_none());
        }
        let assembled = assembler.push(last).unwrap();
        assert_eq!(assembled.taken_at, original.taken_at);
        assert_eq!(symbols(&assembled), symbols(&original));
    }

    #[test]
    fn newer_snapshot_discards_incomplete_one() {
        let older = snapshot(400);
        let mut newer = snapshot(400);
        newer.taken_at += 1000;
        let older_frames = SnapshotFrame::split(&older, 4096).unwrap();
        let newer_frames = SnapshotFrame::split(&newer, 4096).unwrap();

        let mut assembler = FrameAssembler::new();
        assert!(assembler.push(older_frames[0].clone()).is_none());

        let mut assembled = None;
        for frame in newer_frames {
            assembled = assembler.push(frame);
        }
        let assembled = assembled.unwrap();
        assert_eq!(assembled.taken_at, newer.taken_at);
        assert_eq!(assembled.quotes.len(), 400);

        // The missing tail of the older snapshot never completes it.
        for frame in older_frames.into_iter().skip(1) {
            assert!(assembler.push(frame).is_none());
        }
    }

    #[test]
    fn frames_with_bad_indices_are_ignored() {
        let mut assembler = FrameAssembler::new();
        let frame = SnapshotFrame {
            taken_at: 1,
            part: 2,
            parts: 2,
            quotes: Vec::new(),
        };
        assert!(assembler.push(frame).is_none());
    }
}
