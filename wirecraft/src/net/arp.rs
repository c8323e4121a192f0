use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;
use core::net::Ipv4Addr;

/// ARP opcodes.
pub mod arp_opcode {
    pub const REQUEST: u16 = 1;
    pub const REPLY: u16 = 2;
}

/// ARP packet for the Ethernet / IPv4 case (28 bytes).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Arp {
    /// Operation (`arp_opcode` constants).
    pub opcode: u16,

    /// Hardware address of the sender.
    pub sender_hw_addr: MacAddr,

    /// Protocol address of the sender.
    pub sender_proto_addr: Ipv4Addr,

    /// Hardware address of the target (zero in requests).
    pub target_hw_addr: MacAddr,

    /// Protocol address of the target.
    pub target_proto_addr: Ipv4Addr,

    /// Captured bytes after the 28 byte packet (minimum-frame padding).
    /// Serialized verbatim after the header.
    pub padding: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Arp {
    /// Length of the serialized packet in bytes.
    pub const LEN: usize = 28;

    const HW_TYPE_ETHERNET: u16 = 1;
    const PROTO_TYPE_IPV4: u16 = 0x0800;

    /// Build a who-has request asking for the hardware address that owns
    /// `target_proto_addr`.
    pub fn who_has(
        target_proto_addr: Ipv4Addr,
        sender_hw_addr: MacAddr,
        sender_proto_addr: Ipv4Addr,
    ) -> Arp {
        Arp {
            opcode: arp_opcode::REQUEST,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr: MacAddr::NIL,
            target_proto_addr,
            padding: Vec::new(),
            inner: None,
        }
    }

    /// Build an is-at reply announcing that `sender_proto_addr` is owned
    /// by `sender_hw_addr`.
    pub fn is_at(
        sender_hw_addr: MacAddr,
        sender_proto_addr: Ipv4Addr,
        target_hw_addr: MacAddr,
        target_proto_addr: Ipv4Addr,
    ) -> Arp {
        Arp {
            opcode: arp_opcode::REPLY,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr,
            target_proto_addr,
            padding: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Arp, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Arp, bytes);
        let hw_type = cursor.read_u16()?;
        let proto_type = cursor.read_u16()?;
        let hw_len = cursor.read_u8()?;
        let proto_len = cursor.read_u8()?;
        if hw_type != Arp::HW_TYPE_ETHERNET
            || proto_type != Arp::PROTO_TYPE_IPV4
            || hw_len != 6
            || proto_len != 4
        {
            return Err(MalformedError {
                layer: LayerKind::Arp,
                reason: "not an ethernet/ipv4 arp packet",
            }
            .into());
        }
        let opcode = cursor.read_u16()?;
        let sender_hw_addr = cursor.read_mac()?;
        let sender_proto_addr = cursor.read_ipv4_addr()?;
        let target_hw_addr = cursor.read_mac()?;
        let target_proto_addr = cursor.read_ipv4_addr()?;
        let padding = cursor.rest().to_vec();
        Ok(Arp {
            opcode,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr,
            target_proto_addr,
            padding,
            inner: None,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Arp::LEN
    }

    #[inline]
    pub fn trailer_size(&self) -> usize {
        self.padding.len()
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Arp, buf);
        cursor.write_u16(Arp::HW_TYPE_ETHERNET)?;
        cursor.write_u16(Arp::PROTO_TYPE_IPV4)?;
        cursor.write_u8(6)?;
        cursor.write_u8(4)?;
        cursor.write_u16(self.opcode)?;
        cursor.write_mac(self.sender_hw_addr)?;
        cursor.write_ipv4_addr(self.sender_proto_addr)?;
        cursor.write_mac(self.target_hw_addr)?;
        cursor.write_ipv4_addr(self.target_proto_addr)?;
        if !self.padding.is_empty() {
            let end = buf.len();
            buf[end - self.padding.len()..].copy_from_slice(&self.padding);
        }
        Ok(())
    }

    /// A reply matches a request when it announces the address the
    /// request asked for.
    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        match Arp::dissect(bytes) {
            Ok(response) => {
                self.opcode == arp_opcode::REQUEST
                    && response.opcode == arp_opcode::REPLY
                    && response.sender_proto_addr == self.target_proto_addr
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let request = Arp::who_has(
            [192, 168, 0, 1].into(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            [192, 168, 0, 2].into(),
        );
        let bytes = Layer::from(request.clone()).serialize().unwrap();
        assert_eq!(28, bytes.len());
        assert_eq!([0, 1, 8, 0, 6, 4, 0, 1], bytes[..8]);
        assert_eq!(request, Arp::dissect(&bytes).unwrap());
    }

    #[test]
    fn response_matching() {
        let request = Arp::who_has(
            [192, 168, 0, 1].into(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            [192, 168, 0, 2].into(),
        );
        let reply = Arp::is_at(
            MacAddr::new([9, 9, 9, 9, 9, 9]),
            [192, 168, 0, 1].into(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            [192, 168, 0, 2].into(),
        );
        let reply_bytes = Layer::from(reply).serialize().unwrap();
        assert!(request.matches_response(&reply_bytes));

        let other_reply = Arp::is_at(
            MacAddr::new([9, 9, 9, 9, 9, 9]),
            [192, 168, 0, 77].into(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            [192, 168, 0, 2].into(),
        );
        let other_bytes = Layer::from(other_reply).serialize().unwrap();
        assert!(!request.matches_response(&other_bytes));
    }

    #[test]
    fn non_ethernet_ipv4_is_rejected() {
        let mut bytes = [0u8; 28];
        bytes[1] = 6; // hardware type 6
        assert!(matches!(
            Arp::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
