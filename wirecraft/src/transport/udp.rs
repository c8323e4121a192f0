use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// UDP header (RFC 768).
///
/// The length field is derived from the chain size and the checksum
/// from the IPv4/IPv6 pseudo header of the enclosing layer while
/// serializing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Udp {
    pub source_port: u16,
    pub destination_port: u16,

    /// Checksum as dissected. Recomputed at serialization when an
    /// IPv4/IPv6 parent provides the pseudo header.
    pub checksum: u16,

    pub inner: Option<Box<Layer>>,
}

impl Udp {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 8;

    pub fn new(source_port: u16, destination_port: u16) -> Udp {
        Udp {
            source_port,
            destination_port,
            checksum: 0,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Udp, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Udp, bytes);
        let source_port = cursor.read_u16()?;
        let destination_port = cursor.read_u16()?;
        let length = cursor.read_u16()?;
        let checksum = cursor.read_u16()?;
        if usize::from(length) < Udp::LEN || usize::from(length) > bytes.len() {
            return Err(MalformedError {
                layer: LayerKind::Udp,
                reason: "length field inconsistent with the available data",
            }
            .into());
        }
        let payload = &bytes[Udp::LEN..length.into()];
        let inner = if payload.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(payload.to_vec()))))
        };
        Ok(Udp {
            source_port,
            destination_port,
            checksum,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Udp::LEN
    }

    /// The payload bytes carried by this datagram.
    pub fn payload(&self) -> &[u8] {
        match self.inner.as_deref() {
            Some(Layer::Raw(raw)) => &raw.data,
            _ => &[],
        }
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Udp,
                field: "length",
                actual: buf.len(),
                max: u16::MAX.into(),
            });
        }
        {
            let total_len = buf.len() as u16;
            let mut cursor = WriteCursor::new(LayerKind::Udp, &mut buf[..Udp::LEN]);
            cursor.write_u16(self.source_port)?;
            cursor.write_u16(self.destination_port)?;
            cursor.write_u16(total_len)?;
            cursor.write_u16(0)?; // checksum patched below
        }

        // zero is the reserved "no checksum" value, so a computed zero
        // is transmitted as 0xffff
        let checksum = match parent {
            Some(Layer::Ipv4(ipv4)) => checksum::Sum16BitWords::new()
                .add_4bytes(ipv4.source.octets())
                .add_4bytes(ipv4.destination.octets())
                .add_2bytes([0, ip_number::UDP])
                .add_2bytes((buf.len() as u16).to_be_bytes())
                .add_slice(buf)
                .to_ones_complement_with_no_zero()
                .to_be(),
            Some(Layer::Ipv6(ipv6)) => checksum::Sum16BitWords::new()
                .add_16bytes(ipv6.source.octets())
                .add_16bytes(ipv6.destination.octets())
                .add_4bytes((buf.len() as u32).to_be_bytes())
                .add_2bytes([0, 0])
                .add_2bytes([0, ip_number::UDP])
                .add_slice(buf)
                .to_ones_complement_with_no_zero()
                .to_be(),
            _ => self.checksum,
        };
        buf[6..8].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }

    /// A datagram matches as a response when the ports are mirrored.
    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        let mut cursor = ReadCursor::new(LayerKind::Udp, bytes);
        match (cursor.read_u16(), cursor.read_u16()) {
            (Ok(source), Ok(destination)) => {
                source == self.destination_port && destination == self.source_port
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let datagram = Udp::new(5353, 5353) / RawPayload::new(vec![1, 2, 3, 4]);
        let bytes = datagram.serialize().unwrap();
        assert_eq!(12, bytes.len());
        assert_eq!([0x00, 0x0c], [bytes[4], bytes[5]]);
        let dissected = Udp::dissect(&bytes).unwrap();
        assert_eq!(5353, dissected.source_port);
        assert_eq!(&[1, 2, 3, 4], dissected.payload());
    }

    #[test]
    fn checksum_with_pseudo_header() {
        let packet = Ipv4::new([127, 0, 0, 1].into(), [127, 0, 0, 1].into(), 64)
            / Udp::new(1, 1)
            / RawPayload::new(b"ab".to_vec());
        let bytes = packet.serialize().unwrap();
        let udp = &bytes[20..];
        let verify = checksum::Sum16BitWords::new()
            .add_4bytes([127, 0, 0, 1])
            .add_4bytes([127, 0, 0, 1])
            .add_2bytes([0, ip_number::UDP])
            .add_2bytes((udp.len() as u16).to_be_bytes())
            .add_slice(udp)
            .ones_complement();
        assert_eq!(0, verify);
    }

    #[test]
    fn length_validation() {
        let bytes = [0, 1, 0, 2, 0, 100, 0, 0];
        assert!(matches!(
            Udp::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
