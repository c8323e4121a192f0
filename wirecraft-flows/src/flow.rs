use crate::err::StreamError;
use crate::{seq_compare, DataTracker};
use core::cmp::Ordering;
use core::net::IpAddr;
use wirecraft::{Layer, LayerKind, Tcp};

/// State of one direction of a TCP conversation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FlowState {
    Unknown,
    SynSent,
    Established,
    FinSent,
    RstSent,
}

/// What happened while a flow processed a segment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlowEvents {
    /// In-order bytes were appended to the flow's payload buffer.
    pub delivered_data: bool,

    /// The segment fell outside the current window (its sequence number
    /// and payload are reported).
    pub out_of_order: Option<(u32, Vec<u8>)>,
}

/// One direction of a TCP stream: the destination endpoint, the state
/// machine and the data tracker reassembling the byte stream flowing
/// towards that endpoint.
#[derive(Debug)]
pub struct Flow {
    dest_addr: IpAddr,
    dest_port: u16,
    state: FlowState,
    mss: Option<u16>,
    sack_permitted: bool,
    ignore_data: bool,
    data_tracker: DataTracker,
    #[cfg(feature = "ack-tracker")]
    ack_tracker: Option<crate::AckTracker>,
}

impl Flow {
    pub fn new(dest_addr: IpAddr, dest_port: u16, sequence: u32) -> Flow {
        Flow {
            dest_addr,
            dest_port,
            state: FlowState::Unknown,
            mss: None,
            sack_permitted: false,
            ignore_data: false,
            data_tracker: DataTracker::new(sequence),
            #[cfg(feature = "ack-tracker")]
            ack_tracker: None,
        }
    }

    /// Process a packet belonging to this flow. The state machine is
    /// driven even when data packets are ignored.
    pub fn process_packet(&mut self, packet: &Layer) -> FlowEvents {
        let mut events = FlowEvents::default();
        let tcp = match packet.rfind(LayerKind::Tcp).and_then(Layer::as_tcp) {
            Some(tcp) => tcp,
            None => return events,
        };
        self.update_state(tcp);
        #[cfg(feature = "ack-tracker")]
        if let Some(tracker) = &mut self.ack_tracker {
            tracker.process_packet(tcp);
        }
        if self.ignore_data {
            return events;
        }
        let payload = tcp.payload();
        if payload.is_empty() {
            return events;
        }

        let current = self.data_tracker.sequence_number();
        let chunk_end = tcp.sequence.wrapping_add(payload.len() as u32);
        if seq_compare(chunk_end, current) == Ordering::Less
            || seq_compare(tcp.sequence, current) == Ordering::Greater
        {
            events.out_of_order = Some((tcp.sequence, payload.to_vec()));
        }

        // process either way, the tracker drops stale data itself
        if self.data_tracker.process_payload(tcp.sequence, payload.to_vec()) {
            events.delivered_data = true;
        }
        events
    }

    fn update_state(&mut self, tcp: &Tcp) {
        if tcp.fin {
            self.state = FlowState::FinSent;
        } else if tcp.rst {
            self.state = FlowState::RstSent;
        } else if self.state == FlowState::SynSent && tcp.ack {
            #[cfg(feature = "ack-tracker")]
            if self.ack_tracker.is_some() {
                self.ack_tracker = Some(crate::AckTracker::new(tcp.acknowledgment));
            }
            self.state = FlowState::Established;
        } else if self.state == FlowState::Unknown && tcp.syn {
            // this is the listening side sending its SYN (or SYN|ACK)
            #[cfg(feature = "ack-tracker")]
            if self.ack_tracker.is_some() {
                self.ack_tracker = Some(crate::AckTracker::new(tcp.acknowledgment));
            }
            self.state = FlowState::SynSent;
            self.data_tracker
                .set_sequence_number(tcp.sequence.wrapping_add(1));
            self.mss = tcp.mss().ok();
            self.sack_permitted = tcp.sack_permitted();
        }
    }

    /// True if this flow's destination matches the packet's IP
    /// destination address and TCP destination port.
    pub fn packet_belongs(&self, packet: &Layer) -> bool {
        let addr_matches = match self.dest_addr {
            IpAddr::V4(addr) => packet
                .find(LayerKind::Ipv4)
                .and_then(Layer::as_ipv4)
                .is_some_and(|ip| ip.destination == addr),
            IpAddr::V6(addr) => packet
                .find(LayerKind::Ipv6)
                .and_then(Layer::as_ipv6)
                .is_some_and(|ip| ip.destination == addr),
        };
        addr_matches
            && packet
                .rfind(LayerKind::Tcp)
                .and_then(Layer::as_tcp)
                .is_some_and(|tcp| tcp.destination_port == self.dest_port)
    }

    /// Skip the flow forward to a sequence number (see
    /// [`DataTracker::advance_sequence`]).
    pub fn advance_sequence(&mut self, seq: u32) {
        self.data_tracker.advance_sequence(seq);
    }

    /// Feed payload bytes directly into the flow's data tracker.
    /// Returns true iff in-order bytes were delivered.
    pub fn process_payload(&mut self, seq: u32, payload: Vec<u8>) -> bool {
        self.data_tracker.process_payload(seq, payload)
    }

    /// Enable tracking of acknowledged intervals for this flow.
    ///
    /// Fails with [`StreamError::FeatureDisabled`] when the crate was
    /// built without the `ack-tracker` feature.
    pub fn enable_ack_tracking(&mut self) -> Result<(), StreamError> {
        #[cfg(feature = "ack-tracker")]
        {
            if self.ack_tracker.is_none() {
                self.ack_tracker = Some(crate::AckTracker::new(0));
            }
            Ok(())
        }
        #[cfg(not(feature = "ack-tracker"))]
        {
            Err(StreamError::FeatureDisabled)
        }
    }

    /// True if ACK tracking is enabled on this flow.
    pub fn ack_tracking_enabled(&self) -> bool {
        #[cfg(feature = "ack-tracker")]
        {
            self.ack_tracker.is_some()
        }
        #[cfg(not(feature = "ack-tracker"))]
        {
            false
        }
    }

    /// The flow's ACK tracker, when enabled.
    #[cfg(feature = "ack-tracker")]
    pub fn ack_tracker(&self) -> Option<&crate::AckTracker> {
        self.ack_tracker.as_ref()
    }

    /// Mutable access to the flow's ACK tracker, when enabled.
    #[cfg(feature = "ack-tracker")]
    pub fn ack_tracker_mut(&mut self) -> Option<&mut crate::AckTracker> {
        self.ack_tracker.as_mut()
    }

    /// Stop reassembling payload data; the state machine keeps running.
    pub fn ignore_data_packets(&mut self) {
        self.ignore_data = true;
    }

    #[inline]
    pub fn state(&self) -> FlowState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: FlowState) {
        self.state = state;
    }

    /// True if this side sent a FIN or RST.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, FlowState::FinSent | FlowState::RstSent)
    }

    #[inline]
    pub fn dest_addr(&self) -> IpAddr {
        self.dest_addr
    }

    #[inline]
    pub fn dest_port(&self) -> u16 {
        self.dest_port
    }

    /// Maximum segment size announced in this direction's SYN.
    #[inline]
    pub fn mss(&self) -> Option<u16> {
        self.mss
    }

    /// True if the SYN carried the SACK-permitted option.
    #[inline]
    pub fn sack_permitted(&self) -> bool {
        self.sack_permitted
    }

    /// The next expected sequence number.
    #[inline]
    pub fn sequence_number(&self) -> u32 {
        self.data_tracker.sequence_number()
    }

    /// In-order bytes awaiting consumption.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        self.data_tracker.payload()
    }

    #[inline]
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        self.data_tracker.payload_mut()
    }

    /// Number of buffered out of order chunks.
    #[inline]
    pub fn buffered_chunk_count(&self) -> usize {
        self.data_tracker.buffered_payload().len()
    }

    /// Total bytes buffered out of order.
    #[inline]
    pub fn total_buffered_bytes(&self) -> u32 {
        self.data_tracker.total_buffered_bytes()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wirecraft::{Ipv4, RawPayload, TlvOption};

    fn segment(
        src: [u8; 4],
        dst: [u8; 4],
        sport: u16,
        dport: u16,
        seq: u32,
        payload: &[u8],
    ) -> Layer {
        let mut tcp = Tcp::new(sport, dport);
        tcp.sequence = seq;
        tcp.ack = true;
        let mut layer = Ipv4::new(src.into(), dst.into(), 64) / tcp;
        if !payload.is_empty() {
            layer.push_inner(RawPayload::new(payload.to_vec()).into());
        }
        layer
    }

    #[test]
    fn state_machine() {
        let mut flow = Flow::new([10, 0, 0, 2].into(), 80, 0);
        assert_eq!(FlowState::Unknown, flow.state());

        // server side SYN|ACK with MSS & SACK permitted
        let mut syn = Tcp::new(4000, 80);
        syn.syn = true;
        syn.sequence = 999;
        syn.set_options(&[
            TlvOption::new(wirecraft::tcp_option::MSS, 1460u16.to_be_bytes().to_vec()),
            TlvOption::new(wirecraft::tcp_option::SACK_PERMITTED, Vec::new()),
        ])
        .unwrap();
        let packet = Ipv4::new([10, 0, 0, 1].into(), [10, 0, 0, 2].into(), 64) / syn;
        flow.process_packet(&packet);
        assert_eq!(FlowState::SynSent, flow.state());
        assert_eq!(1000, flow.sequence_number());
        assert_eq!(Some(1460), flow.mss());
        assert!(flow.sack_permitted());

        // the ACK completes the handshake
        flow.process_packet(&segment([10, 0, 0, 1], [10, 0, 0, 2], 4000, 80, 1000, b""));
        assert_eq!(FlowState::Established, flow.state());

        // FIN closes this side
        let mut fin = Tcp::new(4000, 80);
        fin.fin = true;
        let packet = Ipv4::new([10, 0, 0, 1].into(), [10, 0, 0, 2].into(), 64) / fin;
        flow.process_packet(&packet);
        assert_eq!(FlowState::FinSent, flow.state());
        assert!(flow.is_finished());
    }

    #[test]
    fn data_and_out_of_order_events() {
        let mut flow = Flow::new([10, 0, 0, 2].into(), 80, 1000);
        flow.set_state(FlowState::Established);

        // a future segment is buffered & reported out of order
        let events =
            flow.process_packet(&segment([10, 0, 0, 1], [10, 0, 0, 2], 4000, 80, 1005, b"world"));
        assert!(!events.delivered_data);
        assert_eq!(Some((1005, b"world".to_vec())), events.out_of_order);

        // the gap closes, both chunks are delivered
        let events =
            flow.process_packet(&segment([10, 0, 0, 1], [10, 0, 0, 2], 4000, 80, 1000, b"hello"));
        assert!(events.delivered_data);
        assert_eq!(None, events.out_of_order);
        assert_eq!(b"helloworld", flow.payload());
    }

    #[test]
    fn ignore_data_still_updates_state() {
        let mut flow = Flow::new([10, 0, 0, 2].into(), 80, 0);
        flow.ignore_data_packets();
        let mut rst = Tcp::new(4000, 80);
        rst.rst = true;
        let packet = Ipv4::new([10, 0, 0, 1].into(), [10, 0, 0, 2].into(), 64) / rst;
        let events = flow.process_packet(&packet);
        assert_eq!(FlowState::RstSent, flow.state());
        assert!(!events.delivered_data);
        assert!(flow.payload().is_empty());
    }

    #[test]
    fn packet_belongs() {
        let flow = Flow::new([10, 0, 0, 2].into(), 80, 0);
        assert!(flow.packet_belongs(&segment([10, 0, 0, 1], [10, 0, 0, 2], 1, 80, 0, b"")));
        assert!(!flow.packet_belongs(&segment([10, 0, 0, 1], [10, 0, 0, 3], 1, 80, 0, b"")));
        assert!(!flow.packet_belongs(&segment([10, 0, 0, 1], [10, 0, 0, 2], 1, 81, 0, b"")));
    }

    #[cfg(feature = "ack-tracker")]
    #[test]
    fn ack_tracking() {
        let mut flow = Flow::new([10, 0, 0, 2].into(), 80, 0);
        flow.enable_ack_tracking().unwrap();
        assert!(flow.ack_tracking_enabled());
        flow.process_packet(&segment([10, 0, 0, 1], [10, 0, 0, 2], 1, 80, 0, b""));
        assert!(flow.ack_tracker().is_some());
    }
}
