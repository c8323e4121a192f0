use crate::err::{DissectError, SerializeError};
use crate::*;

/// Ethernet II frame header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ethernet2 {
    /// Destination hardware address.
    pub destination: MacAddr,

    /// Source hardware address.
    pub source: MacAddr,

    /// `EtherType` of the payload. When left at 0 the value is derived
    /// from the inner layer's kind while serializing.
    pub ether_type: u16,

    pub inner: Option<Box<Layer>>,
}

impl Ethernet2 {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 14;

    pub fn new(destination: MacAddr, source: MacAddr) -> Ethernet2 {
        Ethernet2 {
            destination,
            source,
            ether_type: 0,
            inner: None,
        }
    }

    /// Decode an Ethernet II frame, dissecting the payload based on the
    /// `EtherType` field.
    pub fn dissect(bytes: &[u8]) -> Result<Ethernet2, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Ethernet2, bytes);
        let destination = cursor.read_mac()?;
        let source = cursor.read_mac()?;
        let ether_type = cursor.read_u16()?;
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(layer_from_ether_type(ether_type, cursor.rest())?))
        };
        Ok(Ethernet2 {
            destination,
            source,
            ether_type,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Ethernet2::LEN
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let ether_type = if self.ether_type != 0 {
            self.ether_type
        } else {
            self.inner
                .as_deref()
                .and_then(ether_type_for_layer)
                .unwrap_or(0)
        };
        let mut cursor = WriteCursor::new(LayerKind::Ethernet2, buf);
        cursor.write_mac(self.destination)?;
        cursor.write_mac(self.source)?;
        cursor.write_u16(ether_type)
    }

    /// A frame is a response when its destination address is our source
    /// address and the inner layers match as well.
    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        if bytes.len() < Ethernet2::LEN {
            return false;
        }
        let mut cursor = ReadCursor::new(LayerKind::Ethernet2, bytes);
        let destination = match cursor.read_mac() {
            Ok(addr) => addr,
            Err(_) => return false,
        };
        if destination != self.source {
            return false;
        }
        match self.inner.as_deref() {
            Some(inner) => inner.matches_response(&bytes[Ethernet2::LEN..]),
            None => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let frame = Ethernet2 {
            destination: MacAddr::new([1, 2, 3, 4, 5, 6]),
            source: MacAddr::new([7, 8, 9, 10, 11, 12]),
            ether_type: 0x88b5,
            inner: Some(Box::new(RawPayload::new(vec![0xaa, 0xbb]).into())),
        };
        let bytes = Layer::from(frame.clone()).serialize().unwrap();
        assert_eq!(
            &[1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 0x88, 0xb5, 0xaa, 0xbb],
            &bytes[..]
        );
        let dissected = Ethernet2::dissect(&bytes).unwrap();
        assert_eq!(frame, dissected);
    }

    #[test]
    fn ether_type_derived_from_inner() {
        let frame = Ethernet2::new(MacAddr::BROADCAST, MacAddr::NIL)
            / Ipv4::new([1, 2, 3, 4].into(), [5, 6, 7, 8].into(), 64);
        let bytes = frame.serialize().unwrap();
        assert_eq!([0x08, 0x00], [bytes[12], bytes[13]]);
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(
            Ethernet2::dissect(&[0u8; 13]),
            Err(DissectError::UnexpectedEndOfSlice(_))
        ));
    }

    #[test]
    fn response_matching() {
        let request = Ethernet2::new(
            MacAddr::new([1, 1, 1, 1, 1, 1]),
            MacAddr::new([2, 2, 2, 2, 2, 2]),
        );
        let response = Ethernet2 {
            destination: MacAddr::new([2, 2, 2, 2, 2, 2]),
            source: MacAddr::new([1, 1, 1, 1, 1, 1]),
            ether_type: 0x0800,
            inner: None,
        };
        let response_bytes = Layer::from(response).serialize().unwrap();
        assert!(Layer::from(request).matches_response(&response_bytes));

        let unrelated = Ethernet2 {
            destination: MacAddr::new([9, 9, 9, 9, 9, 9]),
            source: MacAddr::new([1, 1, 1, 1, 1, 1]),
            ether_type: 0x0800,
            inner: None,
        };
        let unrelated_bytes = Layer::from(unrelated).serialize().unwrap();
        assert!(!Layer::from(Ethernet2::new(
            MacAddr::new([1, 1, 1, 1, 1, 1]),
            MacAddr::new([2, 2, 2, 2, 2, 2]),
        ))
        .matches_response(&unrelated_bytes));
    }
}
