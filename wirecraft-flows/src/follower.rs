use crate::err::StreamError;
use crate::{Stream, StreamIdentifier};
use core::net::IpAddr;
use core::time::Duration;
use std::collections::HashMap;
use tracing::debug;
use wirecraft::{tcp_flag, Layer, LayerKind};

/// Why a stream was removed from the follower.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TerminationReason {
    /// No packet was seen for longer than the keep alive interval.
    Timeout,

    /// The stream exceeded the buffered chunk or buffered byte limit.
    BufferedData,

    /// The stream exceeded the SACKed interval limit.
    SackedIntervals,
}

type TerminationCallback = Box<dyn FnMut(&mut Stream, TerminationReason)>;

/// Follows TCP streams, keyed by their direction independent
/// [`StreamIdentifier`].
///
/// New streams are picked up when a lone SYN is seen or, with
/// [`StreamFollower::follow_partial_streams`], when a data carrying
/// segment on an unknown conversation appears. Malformed or non-TCP
/// packets are skipped, never fatal; the only error surfaced from
/// [`StreamFollower::process_packet`] is a missing new-stream callback.
pub struct StreamFollower {
    streams: HashMap<StreamIdentifier, Stream>,
    max_buffered_chunks: usize,
    max_buffered_bytes: u32,
    #[cfg_attr(not(feature = "ack-tracker"), allow(dead_code))]
    max_sacked_intervals: usize,
    keep_alive: Duration,
    last_cleanup: Duration,
    attach_to_flows: bool,
    on_new_stream: Option<Box<dyn FnMut(&mut Stream)>>,
    on_termination: Option<TerminationCallback>,
}

impl Default for StreamFollower {
    fn default() -> StreamFollower {
        StreamFollower::new()
    }
}

impl StreamFollower {
    /// Default limit of buffered out of order chunks per stream.
    pub const DEFAULT_MAX_BUFFERED_CHUNKS: usize = 512;

    /// Default limit of buffered out of order bytes per stream (3 MB).
    pub const DEFAULT_MAX_BUFFERED_BYTES: u32 = 3 * 1024 * 1024;

    /// Default limit of SACKed intervals per stream.
    pub const DEFAULT_MAX_SACKED_INTERVALS: usize = 1024;

    /// Default keep alive interval (5 minutes).
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);

    pub fn new() -> StreamFollower {
        StreamFollower {
            streams: HashMap::new(),
            max_buffered_chunks: StreamFollower::DEFAULT_MAX_BUFFERED_CHUNKS,
            max_buffered_bytes: StreamFollower::DEFAULT_MAX_BUFFERED_BYTES,
            max_sacked_intervals: StreamFollower::DEFAULT_MAX_SACKED_INTERVALS,
            keep_alive: StreamFollower::DEFAULT_KEEP_ALIVE,
            last_cleanup: Duration::ZERO,
            attach_to_flows: false,
            on_new_stream: None,
            on_termination: None,
        }
    }

    /// Process a captured packet with its timestamp.
    pub fn process_packet(
        &mut self,
        packet: &Layer,
        timestamp: Duration,
    ) -> Result<(), StreamError> {
        let tcp = match packet.rfind(LayerKind::Tcp).and_then(Layer::as_tcp) {
            Some(tcp) => tcp,
            None => {
                self.maybe_cleanup(timestamp);
                return Ok(());
            }
        };
        let identifier = match StreamIdentifier::from_packet(packet) {
            Ok(identifier) => identifier,
            Err(error) => {
                debug!(?error, "skipping packet without usable stream identifier");
                self.maybe_cleanup(timestamp);
                return Ok(());
            }
        };

        if !self.streams.contains_key(&identifier) {
            // start tracking on a lone SYN, or attach to a running
            // conversation when it carries data
            let is_syn = tcp.flag_bits() == tcp_flag::SYN;
            let attach = self.attach_to_flows && !tcp.payload().is_empty();
            if !is_syn && !attach {
                self.maybe_cleanup(timestamp);
                return Ok(());
            }
            if self.on_new_stream.is_none() {
                return Err(StreamError::CallbackNotSet);
            }
            let mut stream = match Stream::new(packet, timestamp) {
                Ok(stream) => stream,
                Err(error) => {
                    debug!(?error, "skipping packet that can not open a stream");
                    self.maybe_cleanup(timestamp);
                    return Ok(());
                }
            };
            if !is_syn {
                // we attached mid conversation, assume it is established
                stream.mark_established();
            }
            if let Some(callback) = &mut self.on_new_stream {
                callback(&mut stream);
            }
            self.streams.insert(identifier, stream);
        }

        let stream = self
            .streams
            .get_mut(&identifier)
            .expect("stream inserted above");
        stream.process_packet(packet, timestamp);

        // check the termination limits
        let total_chunks = stream.client_flow().buffered_chunk_count()
            + stream.server_flow().buffered_chunk_count();
        let total_bytes = stream.client_flow().total_buffered_bytes()
            + stream.server_flow().total_buffered_bytes();
        let mut reason = None;
        if total_chunks > self.max_buffered_chunks || total_bytes > self.max_buffered_bytes {
            reason = Some(TerminationReason::BufferedData);
        }
        #[cfg(feature = "ack-tracker")]
        if reason.is_none() {
            let intervals = stream
                .client_flow()
                .ack_tracker()
                .map_or(0, |tracker| tracker.interval_count())
                + stream
                    .server_flow()
                    .ack_tracker()
                    .map_or(0, |tracker| tracker.interval_count());
            if intervals > self.max_sacked_intervals {
                reason = Some(TerminationReason::SackedIntervals);
            }
        }

        if stream.is_finished() || reason.is_some() {
            let mut stream = self
                .streams
                .remove(&identifier)
                .expect("stream looked up above");
            if let (Some(reason), Some(callback)) = (reason, &mut self.on_termination) {
                debug!(?reason, "terminating stream over its limits");
                callback(&mut stream, reason);
            }
        }

        self.maybe_cleanup(timestamp);
        Ok(())
    }

    /// Install the callback invoked once for every new stream. Stream
    /// level callbacks are usually wired up inside it.
    pub fn new_stream_callback<F: FnMut(&mut Stream) + 'static>(&mut self, callback: F) {
        self.on_new_stream = Some(Box::new(callback));
    }

    /// Install the callback invoked when a stream is dropped over a
    /// limit or timeout.
    pub fn stream_termination_callback<F: FnMut(&mut Stream, TerminationReason) + 'static>(
        &mut self,
        callback: F,
    ) {
        self.on_termination = Some(Box::new(callback));
    }

    /// Also create streams for data carrying segments on conversations
    /// whose start was never observed.
    pub fn follow_partial_streams(&mut self, value: bool) {
        self.attach_to_flows = value;
    }

    /// Set the keep alive interval used by the timeout sweep.
    pub fn stream_keep_alive(&mut self, value: Duration) {
        self.keep_alive = value;
    }

    pub fn max_buffered_chunks(&mut self, value: usize) {
        self.max_buffered_chunks = value;
    }

    pub fn max_buffered_bytes(&mut self, value: u32) {
        self.max_buffered_bytes = value;
    }

    pub fn max_sacked_intervals(&mut self, value: usize) {
        self.max_sacked_intervals = value;
    }

    /// Number of streams currently tracked.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Find an active stream by its endpoints.
    pub fn find_stream(
        &mut self,
        client_addr: IpAddr,
        client_port: u16,
        server_addr: IpAddr,
        server_port: u16,
    ) -> Result<&mut Stream, StreamError> {
        let identifier =
            StreamIdentifier::new(client_addr, client_port, server_addr, server_port);
        self.find_stream_by_id(&identifier)
    }

    /// Find an active stream by its identifier.
    pub fn find_stream_by_id(
        &mut self,
        identifier: &StreamIdentifier,
    ) -> Result<&mut Stream, StreamError> {
        self.streams
            .get_mut(identifier)
            .ok_or(StreamError::StreamNotFound)
    }

    fn maybe_cleanup(&mut self, now: Duration) {
        if self.last_cleanup + self.keep_alive <= now {
            self.cleanup_streams(now);
        }
    }

    /// Drop every stream whose last activity is older than the keep
    /// alive interval, invoking the termination callback with
    /// [`TerminationReason::Timeout`].
    pub fn cleanup_streams(&mut self, now: Duration) {
        let keep_alive = self.keep_alive;
        let expired: Vec<StreamIdentifier> = self
            .streams
            .iter()
            .filter(|(_, stream)| stream.last_seen() + keep_alive <= now)
            .map(|(identifier, _)| *identifier)
            .collect();
        for identifier in expired {
            let mut stream = self
                .streams
                .remove(&identifier)
                .expect("identifier collected above");
            debug!(?identifier, "dropping idle stream");
            if let Some(callback) = &mut self.on_termination {
                callback(&mut stream, TerminationReason::Timeout);
            }
        }
        self.last_cleanup = now;
    }
}
