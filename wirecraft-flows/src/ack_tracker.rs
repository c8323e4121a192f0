use crate::seq_compare;
use core::cmp::Ordering;
use std::collections::BTreeMap;

/// Tracks the acknowledged intervals of one direction of a TCP stream.
///
/// The cumulative ACK number advances with every acknowledgment; SACK
/// blocks are unioned into a set of closed intervals strictly above it.
/// No interval in the set starts at or below the cumulative ACK; when
/// the ACK advances, subsumed intervals are discarded.
#[derive(Debug, Default, Clone)]
pub struct AckTracker {
    ack_number: u32,
    use_sack: bool,
    /// Closed intervals `start -> end` (inclusive), non overlapping and
    /// non adjacent. Intervals never wrap; a wrapping SACK block is
    /// split before insertion.
    acked_intervals: BTreeMap<u32, u32>,
}

impl AckTracker {
    pub fn new(initial_ack: u32) -> AckTracker {
        AckTracker {
            ack_number: initial_ack,
            use_sack: true,
            acked_intervals: BTreeMap::new(),
        }
    }

    /// Enable or disable processing of SACK options.
    pub fn use_sack(&mut self, value: bool) {
        self.use_sack = value;
    }

    /// Process the acknowledgment information of a segment.
    pub fn process_packet(&mut self, tcp: &wirecraft::Tcp) {
        if seq_compare(tcp.acknowledgment, self.ack_number) == Ordering::Greater {
            self.ack_number = tcp.acknowledgment;
            self.drop_subsumed_intervals();
        }
        if self.use_sack {
            if let Ok(blocks) = tcp.sack_blocks() {
                self.process_sack(&blocks);
            }
        }
    }

    /// Union the `(left edge, right edge)` pairs of a SACK option into
    /// the acknowledged intervals.
    pub fn process_sack(&mut self, blocks: &[(u32, u32)]) {
        for &(left, right) in blocks {
            // the left edge must be lower than the right edge
            if seq_compare(left, right) != Ordering::Less {
                continue;
            }
            let last = right.wrapping_sub(1);
            if seq_compare(last, self.ack_number) != Ordering::Greater {
                continue;
            }
            for (first, last) in split_wrapping(left, last) {
                if seq_compare(first, self.ack_number) != Ordering::Greater {
                    // the range reaches the cumulative ACK: advance it
                    // to the end of the range instead
                    self.ack_number = last;
                    self.drop_subsumed_intervals();
                } else {
                    self.insert(first, last);
                }
            }
        }
    }

    fn insert(&mut self, first: u32, last: u32) {
        let mut first = first;
        let mut last = last;
        // merge overlapping & adjacent intervals into the new one
        let touching: Vec<u32> = self
            .acked_intervals
            .range(..=last.saturating_add(1))
            .filter(|(_, end)| first == 0 || **end >= first - 1)
            .map(|(start, _)| *start)
            .collect();
        for start in touching {
            let end = self
                .acked_intervals
                .remove(&start)
                .expect("key taken from the map");
            first = first.min(start);
            last = last.max(end);
        }
        self.acked_intervals.insert(first, last);
    }

    /// Remove every interval that the cumulative ACK has caught up
    /// with, trimming a partially covered one.
    fn drop_subsumed_intervals(&mut self) {
        let ack = self.ack_number;
        let mut trimmed = None;
        self.acked_intervals.retain(|start, end| {
            if seq_compare(*start, ack) == Ordering::Greater {
                return true;
            }
            if seq_compare(*end, ack) == Ordering::Greater {
                trimmed = Some((ack.wrapping_add(1), *end));
            }
            false
        });
        if let Some((start, end)) = trimmed {
            if seq_compare(start, end) != Ordering::Greater {
                self.acked_intervals.insert(start, end);
            }
        }
    }

    /// The current cumulative ACK number.
    #[inline]
    pub fn ack_number(&self) -> u32 {
        self.ack_number
    }

    /// The selectively acknowledged closed intervals above the
    /// cumulative ACK.
    #[inline]
    pub fn acked_intervals(&self) -> &BTreeMap<u32, u32> {
        &self.acked_intervals
    }

    /// Number of disjoint acknowledged intervals.
    #[inline]
    pub fn interval_count(&self) -> usize {
        self.acked_intervals.len()
    }

    /// True if the whole segment `[seq, seq + len)` has been
    /// acknowledged, cumulatively or selectively. Zero length segments
    /// count as acknowledged.
    pub fn is_segment_acked(&self, seq: u32, len: u32) -> bool {
        if len == 0 {
            return true;
        }
        let last = seq.wrapping_add(len - 1);
        split_wrapping(seq, last).into_iter().all(|(first, last)| {
            // below the cumulative ACK?
            if seq_compare(last, self.ack_number) == Ordering::Less {
                return true;
            }
            self.contains(first, last)
        })
    }

    fn contains(&self, first: u32, last: u32) -> bool {
        self.acked_intervals
            .range(..=first)
            .next_back()
            .is_some_and(|(_, end)| *end >= last)
    }
}

/// Split a closed sequence range into non wrapping parts.
fn split_wrapping(first: u32, last: u32) -> Vec<(u32, u32)> {
    if first <= last {
        vec![(first, last)]
    } else {
        vec![(first, u32::MAX), (0, last)]
    }
}
