use crate::err::{DissectError, SerializeError};
use crate::*;

/// Packet types of the Linux cooked capture header.
pub mod sll_packet_type {
    pub const HOST: u16 = 0;
    pub const BROADCAST: u16 = 1;
    pub const MULTICAST: u16 = 2;
    pub const OTHER_HOST: u16 = 3;
    pub const OUTGOING: u16 = 4;
}

/// Linux cooked capture (SLL) header as written by libpcap for the
/// `any` pseudo interface.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinuxSll {
    /// Where the packet was headed (`sll_packet_type` constants).
    pub packet_type: u16,

    /// ARPHRD_* type of the capturing interface (1 = Ethernet).
    pub hardware_type: u16,

    /// Number of meaningful bytes in `sender_address`.
    pub sender_address_len: u16,

    /// Link layer address of the sender, zero padded.
    pub sender_address: [u8; 8],

    /// `EtherType` of the payload (for Ethernet-like interfaces).
    pub protocol: u16,

    pub inner: Option<Box<Layer>>,
}

impl LinuxSll {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 16;

    /// ARPHRD value for Ethernet interfaces.
    pub const ARPHRD_ETHER: u16 = 1;

    pub fn dissect(bytes: &[u8]) -> Result<LinuxSll, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::LinuxSll, bytes);
        let packet_type = cursor.read_u16()?;
        let hardware_type = cursor.read_u16()?;
        let sender_address_len = cursor.read_u16()?;
        let sender_address = cursor.read_array::<8>()?;
        let protocol = cursor.read_u16()?;
        let inner = if cursor.is_empty() {
            None
        } else if hardware_type == LinuxSll::ARPHRD_ETHER {
            Some(Box::new(layer_from_ether_type(protocol, cursor.rest())?))
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(cursor.rest().to_vec()))))
        };
        Ok(LinuxSll {
            packet_type,
            hardware_type,
            sender_address_len,
            sender_address,
            protocol,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        LinuxSll::LEN
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let protocol = if self.protocol != 0 {
            self.protocol
        } else {
            self.inner
                .as_deref()
                .and_then(ether_type_for_layer)
                .unwrap_or(0)
        };
        let mut cursor = WriteCursor::new(LayerKind::LinuxSll, buf);
        cursor.write_u16(self.packet_type)?;
        cursor.write_u16(self.hardware_type)?;
        cursor.write_u16(self.sender_address_len)?;
        cursor.write_slice(&self.sender_address)?;
        cursor.write_u16(protocol)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let sll = LinuxSll {
            packet_type: sll_packet_type::HOST,
            hardware_type: LinuxSll::ARPHRD_ETHER,
            sender_address_len: 6,
            sender_address: [1, 2, 3, 4, 5, 6, 0, 0],
            protocol: 0,
            inner: Some(Box::new(
                Layer::from(Ipv4::new([1, 2, 3, 4].into(), [5, 6, 7, 8].into(), 64)),
            )),
        };
        let bytes = Layer::from(sll).serialize().unwrap();
        assert_eq!(16 + 20, bytes.len());
        // derived protocol field
        assert_eq!([0x08, 0x00], [bytes[14], bytes[15]]);

        let dissected = LinuxSll::dissect(&bytes).unwrap();
        assert_eq!(6, dissected.sender_address_len);
        assert_eq!(LayerKind::Ipv4, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn non_ethernet_payload_stays_raw() {
        let mut bytes = vec![0u8; 16];
        bytes[3] = 0x30; // hardware type 0x0030
        bytes.extend_from_slice(&[1, 2, 3]);
        let dissected = LinuxSll::dissect(&bytes).unwrap();
        assert_eq!(LayerKind::Raw, dissected.inner.as_deref().unwrap().kind());
    }
}
