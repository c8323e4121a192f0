use crate::err::StreamError;
use crate::{seq_compare, Flow, FlowState};
use core::cmp::Ordering;
use core::net::IpAddr;
use core::time::Duration;
use wirecraft::{tcp_flag, Layer, LayerKind, MacAddr};

/// Callback invoked with the stream that triggered an event.
pub type StreamCallback = Box<dyn FnMut(&mut Stream)>;

/// Callback invoked for out of order segments with the stream, the
/// segment's sequence number and its payload.
pub type StreamPacketCallback = Box<dyn FnMut(&mut Stream, u32, &[u8])>;

/// Which of the two flows a packet belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Direction {
    Client,
    Server,
}

/// A bidirectional TCP conversation: the pair of flows plus callbacks,
/// timestamps and the recovery machinery.
///
/// Data flowing from the client towards the server lives in the client
/// flow, the opposite direction in the server flow.
pub struct Stream {
    client_flow: Flow,
    server_flow: Flow,
    create_time: Duration,
    last_seen: Duration,
    client_hw_addr: MacAddr,
    server_hw_addr: MacAddr,
    on_client_data: Option<StreamCallback>,
    on_server_data: Option<StreamCallback>,
    on_client_out_of_order: Option<StreamPacketCallback>,
    on_server_out_of_order: Option<StreamPacketCallback>,
    on_closed: Option<StreamCallback>,
    auto_cleanup_client: bool,
    auto_cleanup_server: bool,
    is_partial: bool,
    client_recovery_end: Option<u32>,
    server_recovery_end: Option<u32>,
}

impl core::fmt::Debug for Stream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("client_flow", &self.client_flow)
            .field("server_flow", &self.server_flow)
            .field("create_time", &self.create_time)
            .field("last_seen", &self.last_seen)
            .field("is_partial", &self.is_partial)
            .finish_non_exhaustive()
    }
}

impl Stream {
    /// Build a stream from its first observed packet. The client flow's
    /// destination is the packet's destination endpoint (initial
    /// sequence from TCP.seq), the server flow's destination the source
    /// endpoint (initial sequence from TCP.ack).
    pub fn new(packet: &Layer, timestamp: Duration) -> Result<Stream, StreamError> {
        let tcp = packet
            .rfind(LayerKind::Tcp)
            .and_then(Layer::as_tcp)
            .ok_or(StreamError::InvalidPacket)?;
        let (src_addr, dst_addr): (IpAddr, IpAddr) =
            if let Some(ip) = packet.find(LayerKind::Ipv4).and_then(Layer::as_ipv4) {
                (ip.source.into(), ip.destination.into())
            } else if let Some(ip) = packet.find(LayerKind::Ipv6).and_then(Layer::as_ipv6) {
                (ip.source.into(), ip.destination.into())
            } else {
                return Err(StreamError::InvalidPacket);
            };

        let (client_hw_addr, server_hw_addr) = match packet.as_ethernet2() {
            Some(eth) => (eth.source, eth.destination),
            None => (MacAddr::NIL, MacAddr::NIL),
        };

        Ok(Stream {
            client_flow: Flow::new(dst_addr, tcp.destination_port, tcp.sequence),
            server_flow: Flow::new(src_addr, tcp.source_port, tcp.acknowledgment),
            create_time: timestamp,
            last_seen: timestamp,
            client_hw_addr,
            server_hw_addr,
            on_client_data: None,
            on_server_data: None,
            on_client_out_of_order: None,
            on_server_out_of_order: None,
            on_closed: None,
            auto_cleanup_client: true,
            auto_cleanup_server: true,
            // anything but a lone SYN means we attached mid conversation
            is_partial: tcp.flag_bits() != tcp_flag::SYN,
            client_recovery_end: None,
            server_recovery_end: None,
        })
    }

    /// Route a packet to the flow it belongs to and fire the resulting
    /// callbacks.
    pub fn process_packet(&mut self, packet: &Layer, timestamp: Duration) {
        self.last_seen = timestamp;
        let direction = if self.client_flow.packet_belongs(packet) {
            Direction::Client
        } else if self.server_flow.packet_belongs(packet) {
            Direction::Server
        } else {
            return;
        };

        let events = self.flow_mut(direction).process_packet(packet);

        if let Some((sequence, payload)) = events.out_of_order {
            self.fire_out_of_order(direction, sequence, &payload);
            if self.apply_recovery(direction, sequence) {
                // the hole was bridged; the chunk buffered above was
                // discarded by the skip, so feed it again
                if self.flow_mut(direction).process_payload(sequence, payload) {
                    self.fire_data(direction);
                }
            }
        }
        if events.delivered_data {
            self.fire_data(direction);
        }
        if self.is_finished() {
            if let Some(mut callback) = self.on_closed.take() {
                callback(self);
                if self.on_closed.is_none() {
                    self.on_closed = Some(callback);
                }
            }
        }
    }

    fn flow_mut(&mut self, direction: Direction) -> &mut Flow {
        match direction {
            Direction::Client => &mut self.client_flow,
            Direction::Server => &mut self.server_flow,
        }
    }

    fn fire_data(&mut self, direction: Direction) {
        let callback = match direction {
            Direction::Client => self.on_client_data.take(),
            Direction::Server => self.on_server_data.take(),
        };
        if let Some(mut callback) = callback {
            callback(self);
            let slot = match direction {
                Direction::Client => &mut self.on_client_data,
                Direction::Server => &mut self.on_server_data,
            };
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
        match direction {
            Direction::Client if self.auto_cleanup_client => {
                self.client_flow.payload_mut().clear()
            }
            Direction::Server if self.auto_cleanup_server => {
                self.server_flow.payload_mut().clear()
            }
            _ => {}
        }
    }

    fn fire_out_of_order(&mut self, direction: Direction, sequence: u32, payload: &[u8]) {
        let callback = match direction {
            Direction::Client => self.on_client_out_of_order.take(),
            Direction::Server => self.on_server_out_of_order.take(),
        };
        if let Some(mut callback) = callback {
            callback(self, sequence, payload);
            let slot = match direction {
                Direction::Client => &mut self.on_client_out_of_order,
                Direction::Server => &mut self.on_server_out_of_order,
            };
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    /// Bridge holes up to the recovery window: sequence numbers inside
    /// the window advance the flow, the first one outside it ends
    /// recovery for that direction. Returns true iff the flow was
    /// skipped forward.
    fn apply_recovery(&mut self, direction: Direction, sequence: u32) -> bool {
        let end_slot = match direction {
            Direction::Client => &mut self.client_recovery_end,
            Direction::Server => &mut self.server_recovery_end,
        };
        let Some(end) = *end_slot else {
            return false;
        };
        if seq_compare(end, sequence) != Ordering::Greater {
            *end_slot = None;
            return false;
        }
        let flow = self.flow_mut(direction);
        if seq_compare(sequence, flow.sequence_number()) == Ordering::Greater {
            flow.advance_sequence(sequence);
            true
        } else {
            false
        }
    }

    /// Enable recovery mode on both directions for the given window (in
    /// sequence number space, relative to the current position).
    pub fn enable_recovery_mode(&mut self, recovery_window: u32) {
        self.client_recovery_end =
            Some(self.client_flow.sequence_number().wrapping_add(recovery_window));
        self.server_recovery_end =
            Some(self.server_flow.sequence_number().wrapping_add(recovery_window));
    }

    /// True while at least one direction still bridges holes.
    pub fn is_recovery_mode_enabled(&self) -> bool {
        self.client_recovery_end.is_some() || self.server_recovery_end.is_some()
    }

    /// Enable ACK tracking on both flows.
    pub fn enable_ack_tracking(&mut self) -> Result<(), StreamError> {
        self.client_flow.enable_ack_tracking()?;
        self.server_flow.enable_ack_tracking()
    }

    /// True if ACK tracking is enabled on both flows.
    pub fn ack_tracking_enabled(&self) -> bool {
        self.client_flow.ack_tracking_enabled() && self.server_flow.ack_tracking_enabled()
    }

    /// A RST on either side finishes the stream, otherwise both sides
    /// must have sent a FIN.
    pub fn is_finished(&self) -> bool {
        let client = self.client_flow.state();
        let server = self.server_flow.state();
        if client == FlowState::RstSent || server == FlowState::RstSent {
            return true;
        }
        client == FlowState::FinSent && server == FlowState::FinSent
    }

    pub(crate) fn mark_established(&mut self) {
        self.client_flow.set_state(FlowState::Established);
        self.server_flow.set_state(FlowState::Established);
    }

    #[inline]
    pub fn client_flow(&self) -> &Flow {
        &self.client_flow
    }

    #[inline]
    pub fn client_flow_mut(&mut self) -> &mut Flow {
        &mut self.client_flow
    }

    #[inline]
    pub fn server_flow(&self) -> &Flow {
        &self.server_flow
    }

    #[inline]
    pub fn server_flow_mut(&mut self) -> &mut Flow {
        &mut self.server_flow
    }

    /// Address of the client (the destination of the server flow).
    pub fn client_addr(&self) -> IpAddr {
        self.server_flow.dest_addr()
    }

    /// Address of the server (the destination of the client flow).
    pub fn server_addr(&self) -> IpAddr {
        self.client_flow.dest_addr()
    }

    pub fn client_port(&self) -> u16 {
        self.server_flow.dest_port()
    }

    pub fn server_port(&self) -> u16 {
        self.client_flow.dest_port()
    }

    #[inline]
    pub fn client_hw_addr(&self) -> MacAddr {
        self.client_hw_addr
    }

    #[inline]
    pub fn server_hw_addr(&self) -> MacAddr {
        self.server_hw_addr
    }

    /// In-order bytes sent by the client, awaiting consumption.
    pub fn client_payload(&self) -> &[u8] {
        self.client_flow.payload()
    }

    /// In-order bytes sent by the server, awaiting consumption.
    pub fn server_payload(&self) -> &[u8] {
        self.server_flow.payload()
    }

    #[inline]
    pub fn create_time(&self) -> Duration {
        self.create_time
    }

    #[inline]
    pub fn last_seen(&self) -> Duration {
        self.last_seen
    }

    /// True if the stream was attached to mid conversation (its first
    /// observed packet was not a lone SYN).
    #[inline]
    pub fn is_partial_stream(&self) -> bool {
        self.is_partial
    }

    /// Stop reassembling client data.
    pub fn ignore_client_data(&mut self) {
        self.client_flow.ignore_data_packets();
    }

    /// Stop reassembling server data.
    pub fn ignore_server_data(&mut self) {
        self.server_flow.ignore_data_packets();
    }

    /// Clear (or keep) both payload buffers after their data callback
    /// returned. Enabled by default.
    pub fn auto_cleanup_payloads(&mut self, value: bool) {
        self.auto_cleanup_client = value;
        self.auto_cleanup_server = value;
    }

    pub fn auto_cleanup_client_data(&mut self, value: bool) {
        self.auto_cleanup_client = value;
    }

    pub fn auto_cleanup_server_data(&mut self, value: bool) {
        self.auto_cleanup_server = value;
    }

    pub fn client_data_callback<F: FnMut(&mut Stream) + 'static>(&mut self, callback: F) {
        self.on_client_data = Some(Box::new(callback));
    }

    pub fn server_data_callback<F: FnMut(&mut Stream) + 'static>(&mut self, callback: F) {
        self.on_server_data = Some(Box::new(callback));
    }

    pub fn client_out_of_order_callback<F: FnMut(&mut Stream, u32, &[u8]) + 'static>(
        &mut self,
        callback: F,
    ) {
        self.on_client_out_of_order = Some(Box::new(callback));
    }

    pub fn server_out_of_order_callback<F: FnMut(&mut Stream, u32, &[u8]) + 'static>(
        &mut self,
        callback: F,
    ) {
        self.on_server_out_of_order = Some(Box::new(callback));
    }

    pub fn stream_closed_callback<F: FnMut(&mut Stream) + 'static>(&mut self, callback: F) {
        self.on_closed = Some(Box::new(callback));
    }
}
