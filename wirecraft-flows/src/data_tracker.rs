use crate::seq_compare;
use core::cmp::Ordering;
use std::collections::BTreeMap;

/// Stores and tracks the data of one direction of a TCP stream,
/// reassembling segments and handling out of order packets.
///
/// Bytes that arrive in order are appended to the contiguous `payload`
/// buffer; future chunks are buffered by sequence number until the gap
/// before them closes. Buffered chunks never overlap: when two chunks
/// share a starting sequence number the longer one wins, chunks
/// reaching into already delivered data are sliced.
#[derive(Debug, Default, Clone)]
pub struct DataTracker {
    seq_number: u32,
    payload: Vec<u8>,
    buffered: BTreeMap<u32, Vec<u8>>,
    total_buffered_bytes: u32,
}

impl DataTracker {
    pub fn new(seq_number: u32) -> DataTracker {
        DataTracker {
            seq_number,
            payload: Vec::new(),
            buffered: BTreeMap::new(),
            total_buffered_bytes: 0,
        }
    }

    /// Process the payload of a segment. Returns true iff bytes were
    /// appended to the in-order payload buffer (that is, iff the
    /// delivered payload grew).
    pub fn process_payload(&mut self, seq: u32, mut payload: Vec<u8>) -> bool {
        if payload.is_empty() {
            return false;
        }
        let chunk_end = seq.wrapping_add(payload.len() as u32);
        // everything before the current sequence number was seen already
        if seq_compare(chunk_end, self.seq_number) == Ordering::Less {
            return false;
        }
        let mut seq = seq;
        if seq_compare(seq, self.seq_number) == Ordering::Less {
            // slice off the prefix that was already delivered
            let skip = self.seq_number.wrapping_sub(seq) as usize;
            payload.drain(..skip);
            seq = self.seq_number;
            if payload.is_empty() {
                return false;
            }
        }
        self.store(seq, payload);

        let mut delivered = false;
        loop {
            if let Some(data) = self.buffered.remove(&self.seq_number) {
                self.total_buffered_bytes -= data.len() as u32;
                self.seq_number = self.seq_number.wrapping_add(data.len() as u32);
                self.payload.extend_from_slice(&data);
                delivered = true;
                continue;
            }
            // chunks starting (serially) before the expected sequence
            // can appear after a longer chunk replaced a shorter one
            let stale = self
                .buffered
                .iter()
                .find(|(key, _)| seq_compare(**key, self.seq_number) != Ordering::Greater)
                .map(|(key, _)| *key);
            match stale {
                Some(key) => {
                    let data = self.buffered.remove(&key).expect("key taken from the map");
                    self.total_buffered_bytes -= data.len() as u32;
                    let end = key.wrapping_add(data.len() as u32);
                    if seq_compare(end, self.seq_number) == Ordering::Greater {
                        // keep the part at & after the expected sequence
                        let skip = self.seq_number.wrapping_sub(key) as usize;
                        self.store(self.seq_number, data[skip..].to_vec());
                    }
                }
                None => break,
            }
        }
        delivered
    }

    fn store(&mut self, seq: u32, payload: Vec<u8>) {
        match self.buffered.get_mut(&seq) {
            None => {
                self.total_buffered_bytes += payload.len() as u32;
                self.buffered.insert(seq, payload);
            }
            Some(existing) if existing.len() < payload.len() => {
                self.total_buffered_bytes += (payload.len() - existing.len()) as u32;
                *existing = payload;
            }
            Some(_) => {}
        }
    }

    /// Skip forward to a sequence number, discarding all buffered
    /// chunks up to it. Used to recover from packet loss; does nothing
    /// if `seq` is at or before the current sequence number.
    ///
    /// `seq` should lie on a segment boundary, otherwise the stream
    /// will not resynchronize.
    pub fn advance_sequence(&mut self, seq: u32) {
        if seq_compare(seq, self.seq_number) != Ordering::Greater {
            return;
        }
        let obsolete: Vec<u32> = self
            .buffered
            .keys()
            .copied()
            .filter(|key| seq_compare(*key, seq) != Ordering::Greater)
            .collect();
        for key in obsolete {
            let data = self.buffered.remove(&key).expect("key taken from the map");
            self.total_buffered_bytes -= data.len() as u32;
        }
        self.seq_number = seq;
    }

    /// The next contiguous sequence number expected.
    #[inline]
    pub fn sequence_number(&self) -> u32 {
        self.seq_number
    }

    pub fn set_sequence_number(&mut self, seq: u32) {
        self.seq_number = seq;
    }

    /// Contiguous bytes delivered in order, awaiting consumption.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// Chunks waiting for the gap before them to close, by sequence
    /// number.
    #[inline]
    pub fn buffered_payload(&self) -> &BTreeMap<u32, Vec<u8>> {
        &self.buffered
    }

    /// Sum of the sizes of all buffered chunks.
    #[inline]
    pub fn total_buffered_bytes(&self) -> u32 {
        self.total_buffered_bytes
    }
}
