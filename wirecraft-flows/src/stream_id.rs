use crate::err::StreamError;
use core::net::IpAddr;
use wirecraft::{Layer, LayerKind};

/// Direction independent identifier of a TCP/UDP conversation.
///
/// The two `(address, port)` endpoints are ordered so the
/// lexicographically smaller one becomes `min`; both directions of a
/// flow therefore map to the same identifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct StreamIdentifier {
    pub min_address: IpAddr,
    pub min_port: u16,
    pub max_address: IpAddr,
    pub max_port: u16,
}

impl StreamIdentifier {
    pub fn new(addr_a: IpAddr, port_a: u16, addr_b: IpAddr, port_b: u16) -> StreamIdentifier {
        if (addr_a, port_a) <= (addr_b, port_b) {
            StreamIdentifier {
                min_address: addr_a,
                min_port: port_a,
                max_address: addr_b,
                max_port: port_b,
            }
        } else {
            StreamIdentifier {
                min_address: addr_b,
                min_port: port_b,
                max_address: addr_a,
                max_port: port_a,
            }
        }
    }

    /// Build the identifier of the conversation a packet belongs to.
    /// Fails with [`StreamError::InvalidPacket`] when the packet has no
    /// TCP/UDP or IP layer.
    pub fn from_packet(packet: &Layer) -> Result<StreamIdentifier, StreamError> {
        let (source_port, dest_port) =
            if let Some(tcp) = packet.rfind(LayerKind::Tcp).and_then(Layer::as_tcp) {
                (tcp.source_port, tcp.destination_port)
            } else if let Some(Layer::Udp(udp)) = packet.rfind(LayerKind::Udp) {
                (udp.source_port, udp.destination_port)
            } else {
                return Err(StreamError::InvalidPacket);
            };
        let (source, destination): (IpAddr, IpAddr) =
            if let Some(ip) = packet.find(LayerKind::Ipv4).and_then(Layer::as_ipv4) {
                (ip.source.into(), ip.destination.into())
            } else if let Some(ip) = packet.find(LayerKind::Ipv6).and_then(Layer::as_ipv6) {
                (ip.source.into(), ip.destination.into())
            } else {
                return Err(StreamError::InvalidPacket);
            };
        Ok(StreamIdentifier::new(
            source,
            source_port,
            destination,
            dest_port,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wirecraft::{Ipv4, Tcp};

    #[test]
    fn both_directions_share_a_key() {
        let forward: Layer =
            Ipv4::new([10, 0, 0, 1].into(), [10, 0, 0, 2].into(), 64) / Tcp::new(4000, 80);
        let backward: Layer =
            Ipv4::new([10, 0, 0, 2].into(), [10, 0, 0, 1].into(), 64) / Tcp::new(80, 4000);
        assert_eq!(
            StreamIdentifier::from_packet(&forward).unwrap(),
            StreamIdentifier::from_packet(&backward).unwrap()
        );
    }

    #[test]
    fn same_address_sorts_by_port() {
        let id = StreamIdentifier::new(
            IpAddr::from([1, 1, 1, 1]),
            9000,
            IpAddr::from([1, 1, 1, 1]),
            80,
        );
        assert_eq!(80, id.min_port);
        assert_eq!(9000, id.max_port);
    }

    #[test]
    fn non_stream_packet_is_invalid() {
        let layer: Layer = Ipv4::new([1, 1, 1, 1].into(), [2, 2, 2, 2].into(), 64).into();
        assert_eq!(
            Err(StreamError::InvalidPacket),
            StreamIdentifier::from_packet(&layer)
        );
    }
}
