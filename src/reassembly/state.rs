//! Sequence-ordered reassembly of one TCP flow
//!
//! Segments are cached by sequence number and appended to a contiguous buffer
//! once the bytes before them have arrived. All sequence arithmetic wraps
//! modulo 2^32.
//!
//! ## Policies
//!
//! - A segment strictly behind `expected_next` is dropped, unless it extends
//!   past `expected_next`; then only its unseen tail is cached.
//! - Two cached segments with the same sequence number keep the longer one.
//! - A cached segment that ends up straddling `expected_next` once the gap
//!   is filled contributes only its unseen tail.
//! - While `expected_next` is unset, a segment whose first four bytes look
//!   like a plausible frame length reseeds it (resync after a reset).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::types::{seq_advance, seq_behind, seq_distance};
use crate::wire::cursor::peek_u32_be;

/// Upper bound (exclusive) on the leading length that may reseed a flow.
const RESEED_LENGTH_LIMIT: u32 = 0x0f_ffff;

/// Outcome of [`ReassemblyState::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Push {
    /// The segment (or its tail) was cached.
    pub cached: bool,
    /// Bytes appended to the contiguous buffer by this push.
    pub delivered: usize,
    /// `expected_next` was seeded from this segment.
    pub reseeded: bool,
}

/// Outcome of [`ReassemblyState::evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eviction {
    /// Out-of-order segments removed from the cache.
    pub fragments: usize,
    /// The flow was idle past the timeout and was reset.
    pub flow_reset: bool,
}

/// Reassembly buffers for the active flow.
#[derive(Debug, Clone, Default)]
pub struct ReassemblyState {
    expected_next: Option<u32>,
    buffer: Vec<u8>,
    cache: HashMap<u32, Vec<u8>>,
    last_activity: Option<Instant>,
}

impl ReassemblyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the stream after the segment at `seq` (already consumed).
    pub fn begin(&mut self, seq: u32, len: usize, now: Instant) {
        self.reset();
        self.expected_next = Some(seq_advance(seq, len));
        self.last_activity = Some(now);
    }

    /// Drop all buffered data and unset `expected_next`.
    pub fn reset(&mut self) {
        self.expected_next = None;
        self.buffer.clear();
        self.cache.clear();
        self.last_activity = None;
    }

    /// Accept one segment and deliver every contiguous cached segment.
    pub fn push(&mut self, seq: u32, payload: &[u8], now: Instant) -> Push {
        let mut outcome = Push::default();

        if self.expected_next.is_none() && payload.len() > 4 {
            if let Some(length) = peek_u32_be(payload) {
                if length < RESEED_LENGTH_LIMIT {
                    debug!("Reseeding stream at seq {}", seq);
                    self.expected_next = Some(seq);
                    outcome.reseeded = true;
                }
            }
        }

        outcome.cached = match self.expected_next {
            Some(expected) if seq_behind(seq, expected) => self.cache_tail(seq, expected, payload),
            _ => self.cache_segment(seq, payload),
        };

        outcome.delivered = self.drain(now);
        outcome
    }

    fn cache_tail(&mut self, seq: u32, expected: u32, payload: &[u8]) -> bool {
        let overlap = seq_distance(seq, expected) as u32 as usize;
        match payload.get(overlap..) {
            Some(tail) if !tail.is_empty() => {
                trace!("Segment {} overlaps {}; caching {} byte tail", seq, expected, tail.len());
                self.cache_segment(expected, tail)
            }
            _ => {
                trace!("Dropping retransmitted segment {} ({} bytes)", seq, payload.len());
                false
            }
        }
    }

    fn cache_segment(&mut self, seq: u32, payload: &[u8]) -> bool {
        if payload.is_empty() {
            return false;
        }
        match self.cache.entry(seq) {
            Entry::Occupied(mut entry) => {
                if entry.get().len() < payload.len() {
                    entry.insert(payload.to_vec());
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(payload.to_vec());
            }
        }
        true
    }

    fn drain(&mut self, now: Instant) -> usize {
        let Some(mut expected) = self.expected_next else {
            return 0;
        };

        let mut delivered = 0;
        while let Some(bytes) = self.take_at(expected) {
            self.buffer.extend_from_slice(&bytes);
            delivered += bytes.len();
            expected = seq_advance(expected, bytes.len());
            self.last_activity = Some(now);
        }
        self.expected_next = Some(expected);
        delivered
    }

    /// Remove the cached bytes starting at `expected`.
    ///
    /// Entries cached ahead of an earlier `expected_next` may now start
    /// behind it. Those are trimmed to their unseen tail or dropped.
    fn take_at(&mut self, expected: u32) -> Option<Vec<u8>> {
        if let Some(bytes) = self.cache.remove(&expected) {
            return Some(bytes);
        }

        let behind: Vec<u32> =
            self.cache.keys().copied().filter(|&seq| seq_behind(seq, expected)).collect();
        let mut longest: Option<Vec<u8>> = None;
        for seq in behind {
            let Some(bytes) = self.cache.remove(&seq) else {
                continue;
            };
            let overlap = seq_distance(seq, expected) as u32 as usize;
            match bytes.get(overlap..) {
                Some(tail) if !tail.is_empty() => {
                    trace!(
                        "Cached segment {} straddles {}; keeping {} byte tail",
                        seq,
                        expected,
                        tail.len()
                    );
                    if longest.as_ref().is_none_or(|kept| kept.len() < tail.len()) {
                        longest = Some(tail.to_vec());
                    }
                }
                _ => trace!("Dropping superseded cached segment {}", seq),
            }
        }
        longest
    }

    /// Evict stale state.
    ///
    /// Cached segments are dropped once nothing has been delivered for
    /// `timeout`; when the flow itself has gone quiet that long, everything
    /// is reset.
    pub fn evict(&mut self, now: Instant, timeout: Duration) -> Eviction {
        let stale = match self.last_activity {
            Some(last) => now.saturating_duration_since(last) > timeout,
            None => true,
        };
        if !stale {
            return Eviction::default();
        }

        let fragments = self.cache.len();
        self.cache.clear();

        let flow_reset = self.last_activity.is_some();
        if flow_reset {
            self.reset();
        }
        Eviction { fragments, flow_reset }
    }

    pub fn expected_next(&self) -> Option<u32> {
        self.expected_next
    }

    /// Contiguous bytes not yet consumed as frames.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    pub fn cached_segments(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_bytes(&self) -> usize {
        self.cache.values().map(Vec::len).sum()
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn started(seq: u32, len: usize) -> (ReassemblyState, Instant) {
        let now = Instant::now();
        let mut state = ReassemblyState::new();
        state.begin(seq, len, now);
        (state, now)
    }

    fn filled(len: usize, value: u8) -> Vec<u8> {
        vec![value; len]
    }

    #[test]
    fn in_order_segments_are_delivered() {
        let (mut state, now) = started(100, 100);
        let push = state.push(200, &filled(100, 1), now);
        assert_eq!(push, Push { cached: true, delivered: 100, reseeded: false });
        assert_eq!(state.expected_next(), Some(300));
        assert_eq!(state.cached_segments(), 0);
    }

    #[test]
    fn out_of_order_segments_wait_for_the_gap() {
        let (mut state, now) = started(100, 100);

        assert_eq!(state.push(300, &filled(50, 3), now).delivered, 0);
        assert_eq!(state.cached_segments(), 1);

        assert_eq!(state.push(200, &filled(100, 2), now).delivered, 150);
        let mut expected = filled(100, 2);
        expected.extend(filled(50, 3));
        assert_eq!(state.buffer(), expected.as_slice());
        assert_eq!(state.expected_next(), Some(350));
    }

    #[test]
    fn retransmits_are_dropped() {
        let (mut state, now) = started(100, 100);
        state.push(200, &filled(100, 2), now);

        let push = state.push(150, &filled(50, 9), now);
        assert!(!push.cached);
        assert_eq!(state.buffer().len(), 100);
    }

    #[test]
    fn overlapping_segment_contributes_its_tail() {
        let (mut state, now) = started(100, 100);
        let mut payload = filled(50, 9);
        payload.extend(filled(30, 4));

        let push = state.push(150, &payload, now);
        assert_eq!(push.delivered, 30);
        assert_eq!(state.buffer(), filled(30, 4).as_slice());
        assert_eq!(state.expected_next(), Some(230));
    }

    #[test]
    fn cached_segment_straddling_the_gap_is_trimmed() {
        let (mut state, now) = started(100, 100);

        // 250..350 arrives first, then 200..300 fills the gap and overlaps it.
        assert_eq!(state.push(250, &filled(100, 2), now).delivered, 0);
        assert_eq!(state.push(200, &filled(100, 1), now).delivered, 150);
        assert_eq!(state.expected_next(), Some(350));
        assert_eq!(state.cached_segments(), 0);

        assert_eq!(state.push(350, &filled(50, 3), now).delivered, 50);
        let mut expected = filled(100, 1);
        expected.extend(filled(50, 2));
        expected.extend(filled(50, 3));
        assert_eq!(state.buffer(), expected.as_slice());
        assert_eq!(state.expected_next(), Some(400));
    }

    #[test]
    fn fully_covered_cached_segment_is_dropped() {
        let (mut state, now) = started(0, 10);
        state.push(20, &filled(5, 9), now);

        assert_eq!(state.push(10, &filled(30, 1), now).delivered, 30);
        assert_eq!(state.buffer(), filled(30, 1).as_slice());
        assert_eq!(state.cached_segments(), 0);
        assert_eq!(state.expected_next(), Some(40));
    }

    #[test]
    fn duplicate_sequence_keeps_longer_payload() {
        let (mut state, now) = started(0, 10);
        state.push(20, &filled(5, 1), now);
        state.push(20, &filled(8, 2), now);
        state.push(20, &filled(3, 3), now);
        assert_eq!(state.cached_bytes(), 8);
    }

    #[test]
    fn sequence_wraps() {
        let (mut state, now) = started(u32::MAX - 9, 5);
        state.push(5, &filled(10, 2), now);
        assert_eq!(state.push(u32::MAX - 4, &filled(10, 1), now).delivered, 20);
        assert_eq!(state.expected_next(), Some(15));
    }

    #[test]
    fn unset_stream_reseeds_on_plausible_length() {
        let now = Instant::now();
        let mut state = ReassemblyState::new();
        let mut payload = 0x20u32.to_be_bytes().to_vec();
        payload.extend(filled(4, 0));

        let push = state.push(5000, &payload, now);
        assert!(push.reseeded);
        assert_eq!(push.delivered, 8);
        assert_eq!(state.expected_next(), Some(5008));
    }

    #[test]
    fn unset_stream_caches_without_delivering() {
        let now = Instant::now();
        let mut state = ReassemblyState::new();
        let payload = [0xff, 0xff, 0xff, 0xff, 1, 2];

        let push = state.push(5000, &payload, now);
        assert!(!push.reseeded);
        assert!(push.cached);
        assert_eq!(push.delivered, 0);
        assert_eq!(state.expected_next(), None);

        // A short payload never reseeds.
        assert!(!state.push(6000, &[0, 0, 0, 1], now).reseeded);
    }

    #[test]
    fn eviction_respects_timeout() {
        let timeout = Duration::from_secs(3);
        let (mut state, start) = started(0, 10);
        state.push(50, &filled(5, 1), start);

        assert_eq!(state.evict(start + Duration::from_secs(2), timeout), Eviction::default());
        assert_eq!(state.cached_segments(), 1);

        let eviction = state.evict(start + Duration::from_secs(4), timeout);
        assert_eq!(eviction, Eviction { fragments: 1, flow_reset: true });
        assert_eq!(state.expected_next(), None);
        assert!(state.buffer().is_empty());
    }

    #[test]
    fn eviction_without_activity_drops_only_fragments() {
        let now = Instant::now();
        let mut state = ReassemblyState::new();
        state.push(5000, &[0xff, 0xff, 0xff, 0xff, 1], now);

        let eviction = state.evict(now, Duration::from_secs(3));
        assert_eq!(eviction, Eviction { fragments: 1, flow_reset: false });
    }

    fn chunked(base: u32, sizes: &[usize]) -> Vec<(u32, Vec<u8>)> {
        let mut seq = base;
        let mut fill = 0u8;
        sizes
            .iter()
            .map(|&size| {
                fill = fill.wrapping_add(1);
                let segment = (seq, vec![fill; size]);
                seq = seq_advance(seq, size);
                segment
            })
            .collect()
    }

    fn reassemble(base: u32, segments: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let now = Instant::now();
        let mut state = ReassemblyState::new();
        state.begin(base, 0, now);
        for (seq, payload) in segments {
            state.push(*seq, payload, now);
        }
        state.buffer().to_vec()
    }

    proptest! {
        #[test]
        fn delivery_order_does_not_matter(
            base in any::<u32>(),
            (sizes, order) in prop::collection::vec(1usize..64, 1..12).prop_flat_map(|sizes| {
                let indices: Vec<usize> = (0..sizes.len()).collect();
                (Just(sizes), Just(indices).prop_shuffle())
            }),
        ) {
            let segments = chunked(base, &sizes);
            let shuffled: Vec<_> = order.iter().map(|&i| segments[i].clone()).collect();

            let in_order = reassemble(base, &segments);
            prop_assert_eq!(in_order.len(), sizes.iter().sum::<usize>());
            prop_assert_eq!(reassemble(base, &shuffled), in_order);
        }

        #[test]
        fn wraparound_reassembles(
            offset in 1u32..256,
            sizes in prop::collection::vec(1usize..64, 2..8),
        ) {
            let base = u32::MAX - offset + 1;
            let segments = chunked(base, &sizes);
            let mut reversed = segments.clone();
            reversed.reverse();

            let expected: Vec<u8> = segments.iter().flat_map(|(_, p)| p.iter().copied()).collect();
            prop_assert_eq!(reassemble(base, &reversed), expected);
        }
    }
}
