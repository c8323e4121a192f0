use core::net::Ipv4Addr;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};
use wirecraft::{layer_from_ip_number, Ipv4, Layer, LayerKind, RawPayload};

/// The status of a packet handed to [`Reassembler::process`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReassemblyStatus {
    /// The packet does not contain a fragmented IPv4 layer.
    NotFragmented,

    /// The packet is a fragment and the datagram is not complete yet.
    Fragmented,

    /// The packet completed a fragmented datagram; the passed layer now
    /// holds the whole payload.
    Reassembled,
}

/// How overlapping fragments are resolved. Only the policy that keeps
/// the first seen bytes and drops overlapping newcomers is defined.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum OverlapPolicy {
    #[default]
    None,
}

/// Callback invoked with the first seen header of an evicted datagram.
pub type EvictionCallback = Box<dyn FnMut(&Ipv4)>;

/// Identifies all fragments of one logical datagram. The address pair
/// is canonicalized so both directions share a key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct DatagramKey {
    identification: u16,
    low_addr: Ipv4Addr,
    high_addr: Ipv4Addr,
}

impl DatagramKey {
    fn new(identification: u16, a: Ipv4Addr, b: Ipv4Addr) -> DatagramKey {
        let (low_addr, high_addr) = if a <= b { (a, b) } else { (b, a) };
        DatagramKey {
            identification,
            low_addr,
            high_addr,
        }
    }
}

/// A datagram being reconstructed.
#[derive(Debug)]
struct PendingDatagram {
    /// First seen header, without payload or padding.
    header: Ipv4,

    /// `(byte offset, payload)` sorted by offset, non overlapping.
    fragments: Vec<(u32, Vec<u8>)>,

    /// True once the fragment without the more-fragments flag was seen.
    received_end: bool,

    /// Bytes accepted so far.
    received_size: u32,

    /// Total payload size, authoritative from the first end fragment.
    total_size: u32,

    first_seen_ms: u64,
}

impl PendingDatagram {
    fn is_complete(&self) -> bool {
        self.received_end && self.received_size == self.total_size
    }

    fn overlaps(&self, start: u32, end: u32) -> bool {
        self.fragments
            .iter()
            .any(|(offset, data)| start < offset + data.len() as u32 && *offset < end)
    }
}

/// Reassembles fragmented IPv4 packets.
///
/// Feed packets in via [`Reassembler::process`]: fragments are buffered
/// per datagram until the last hole closes, at which point the passed
/// layer is rewritten in place to carry the full payload. Bounded by an
/// optional per-datagram fragment cap and age based eviction; both
/// checks happen on the caller's thread during `process` calls (there
/// is no background task, call [`Reassembler::sweep`] for prompt
/// eviction).
pub struct Reassembler {
    datagrams: HashMap<DatagramKey, PendingDatagram>,
    #[allow(dead_code)]
    policy: OverlapPolicy,
    max_fragments: u64,
    overflow_callback: Option<EvictionCallback>,
    timeout_ms: u64,
    check_interval_ms: u64,
    timeout_callback: Option<EvictionCallback>,
    last_check_ms: u64,
    complete_count: u64,
    damaged_count: u64,
    buffered_bytes: u64,
}

impl Default for Reassembler {
    fn default() -> Reassembler {
        Reassembler::new()
    }
}

impl Reassembler {
    pub fn new() -> Reassembler {
        Reassembler::with_policy(OverlapPolicy::None)
    }

    pub fn with_policy(policy: OverlapPolicy) -> Reassembler {
        Reassembler {
            datagrams: HashMap::new(),
            policy,
            max_fragments: 0,
            overflow_callback: None,
            timeout_ms: 0,
            check_interval_ms: 60_000,
            timeout_callback: None,
            last_check_ms: 0,
            complete_count: 0,
            damaged_count: 0,
            buffered_bytes: 0,
        }
    }

    /// Limit the number of fragments buffered per datagram (0 lifts the
    /// limit). The callback is invoked with the first seen header of
    /// every overflowing datagram.
    pub fn set_max_fragments_per_datagram(
        &mut self,
        max_fragments: u64,
        callback: Option<EvictionCallback>,
    ) {
        self.max_fragments = max_fragments;
        self.overflow_callback = callback;
    }

    /// Evict datagrams whose first fragment is older than `timeout_ms`.
    /// The check runs at most every `check_interval_s` seconds,
    /// piggybacked onto `process` calls.
    pub fn set_datagram_timeout(
        &mut self,
        timeout_ms: u64,
        check_interval_s: u64,
        callback: Option<EvictionCallback>,
    ) {
        self.timeout_ms = timeout_ms;
        self.check_interval_ms = check_interval_s * 1000;
        self.timeout_callback = callback;
    }

    /// Process a packet using the current wall clock.
    pub fn process(&mut self, layer: &mut Layer) -> ReassemblyStatus {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        self.process_at(layer, now_ms)
    }

    /// Process a packet at the given timestamp (milliseconds since an
    /// arbitrary epoch; timestamps only need to be monotonic).
    pub fn process_at(&mut self, layer: &mut Layer, now_ms: u64) -> ReassemblyStatus {
        let status = self.track_fragment(layer, now_ms);
        if status != ReassemblyStatus::Reassembled {
            self.check_expired(now_ms);
        }
        status
    }

    fn track_fragment(&mut self, layer: &mut Layer, now_ms: u64) -> ReassemblyStatus {
        let Some(ip) = layer.find_mut(LayerKind::Ipv4).and_then(Layer::as_ipv4_mut) else {
            return ReassemblyStatus::NotFragmented;
        };
        if !ip.is_fragmenting_payload() {
            return ReassemblyStatus::NotFragmented;
        }

        let payload = match ip.inner.as_deref() {
            Some(Layer::Raw(raw)) => raw.data.clone(),
            Some(inner) => match inner.serialize() {
                Ok(bytes) => bytes,
                Err(error) => {
                    debug!(?error, "dropping fragment with unserializable payload");
                    return ReassemblyStatus::Fragmented;
                }
            },
            None => Vec::new(),
        };
        let offset = ip.fragment_offset_bytes();
        let end = offset + payload.len() as u32;
        let key = DatagramKey::new(ip.identification, ip.source, ip.destination);

        let datagram = self.datagrams.entry(key.clone()).or_insert_with(|| {
            let mut header = ip.clone();
            header.inner = None;
            header.padding = Vec::new();
            PendingDatagram {
                header,
                fragments: Vec::new(),
                received_end: false,
                received_size: 0,
                total_size: 0,
                first_seen_ms: now_ms,
            }
        });

        // the first end fragment is authoritative for the total size;
        // fragments conflicting with it are dropped
        let conflicts_with_end = datagram.received_end
            && (end > datagram.total_size || (!ip.more_fragments && end != datagram.total_size));
        let accept = !conflicts_with_end
            && !payload.is_empty()
            && !datagram.overlaps(offset, end);
        if accept {
            let index = datagram
                .fragments
                .partition_point(|(existing, _)| *existing < offset);
            datagram.received_size += payload.len() as u32;
            self.buffered_bytes += payload.len() as u64;
            datagram.fragments.insert(index, (offset, payload));
            if !ip.more_fragments {
                datagram.received_end = true;
                datagram.total_size = end;
            }
            trace!(
                identification = datagram.header.identification,
                offset,
                received = datagram.received_size,
                "buffered fragment"
            );
        }

        if datagram.is_complete() {
            let datagram = self
                .datagrams
                .remove(&key)
                .expect("entry inserted above");
            self.buffered_bytes -= u64::from(datagram.received_size);
            self.complete_count += 1;

            let mut payload = Vec::with_capacity(datagram.total_size as usize);
            for (_, fragment) in &datagram.fragments {
                payload.extend_from_slice(fragment);
            }
            let inner = layer_from_ip_number(datagram.header.protocol, &payload)
                .unwrap_or_else(|_| Layer::Raw(RawPayload::new(payload)));

            // rewrite the passed layer in place with the first seen
            // header & the reassembled payload
            let mut header = datagram.header;
            header.more_fragments = false;
            header.fragment_offset = 0;
            header.inner = Some(Box::new(inner));
            *ip = header;
            return ReassemblyStatus::Reassembled;
        }

        // enforce the per-datagram fragment cap
        if self.max_fragments > 0 && datagram.fragments.len() as u64 > self.max_fragments {
            let datagram = self
                .datagrams
                .remove(&key)
                .expect("entry inserted above");
            self.buffered_bytes -= u64::from(datagram.received_size);
            self.damaged_count += 1;
            debug!(
                identification = datagram.header.identification,
                "dropping datagram over its fragment limit"
            );
            if let Some(callback) = &mut self.overflow_callback {
                callback(&datagram.header);
            }
        }
        ReassemblyStatus::Fragmented
    }

    fn check_expired(&mut self, now_ms: u64) {
        if self.timeout_ms == 0 {
            return;
        }
        if now_ms.saturating_sub(self.last_check_ms) < self.check_interval_ms {
            return;
        }
        self.sweep(now_ms);
    }

    /// Evict every datagram older than the configured timeout, invoking
    /// the timeout callback for each.
    pub fn sweep(&mut self, now_ms: u64) {
        self.last_check_ms = now_ms;
        if self.timeout_ms == 0 {
            return;
        }
        let timeout_ms = self.timeout_ms;
        let expired: Vec<DatagramKey> = self
            .datagrams
            .iter()
            .filter(|(_, datagram)| {
                now_ms.saturating_sub(datagram.first_seen_ms) >= timeout_ms
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            let datagram = self
                .datagrams
                .remove(&key)
                .expect("key collected above");
            self.buffered_bytes -= u64::from(datagram.received_size);
            self.damaged_count += 1;
            debug!(
                identification = datagram.header.identification,
                "dropping expired datagram"
            );
            if let Some(callback) = &mut self.timeout_callback {
                callback(&datagram.header);
            }
        }
    }

    /// Drop all buffered fragments.
    pub fn clear(&mut self) {
        self.datagrams.clear();
        self.buffered_bytes = 0;
    }

    /// Drop the buffered fragments of one datagram. The address pair
    /// does not need to be ordered.
    pub fn remove(&mut self, identification: u16, addr1: Ipv4Addr, addr2: Ipv4Addr) {
        let key = DatagramKey::new(identification, addr1, addr2);
        if let Some(datagram) = self.datagrams.remove(&key) {
            self.buffered_bytes -= u64::from(datagram.received_size);
        }
    }

    /// Total number of datagrams reassembled completely.
    pub fn complete_count(&self) -> u64 {
        self.complete_count
    }

    /// Total number of datagrams dropped by limits or timeouts.
    pub fn damaged_count(&self) -> u64 {
        self.damaged_count
    }

    /// Number of datagrams currently being reconstructed.
    pub fn incomplete_count(&self) -> usize {
        self.datagrams.len()
    }

    /// Bytes currently buffered across all incomplete datagrams.
    pub fn buffered_bytes(&self) -> u64 {
        self.buffered_bytes
    }
}
