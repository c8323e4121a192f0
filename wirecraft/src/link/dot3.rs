use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// IEEE 802.3 frame header (length field framing, payload is LLC).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dot3 {
    /// Destination hardware address.
    pub destination: MacAddr,

    /// Source hardware address.
    pub source: MacAddr,

    /// Captured bytes after the declared payload length (minimum-frame
    /// padding). Serialized verbatim after the payload.
    pub padding: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Dot3 {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 14;

    /// Largest value of the length field that still denotes a length
    /// (bigger values are EtherTypes and belong to Ethernet II).
    pub const MAX_LENGTH_FIELD: u16 = 1500;

    pub fn new(destination: MacAddr, source: MacAddr) -> Dot3 {
        Dot3 {
            destination,
            source,
            padding: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dot3, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dot3, bytes);
        let destination = cursor.read_mac()?;
        let source = cursor.read_mac()?;
        let length = cursor.read_u16()?;
        if length > Dot3::MAX_LENGTH_FIELD {
            return Err(MalformedError {
                layer: LayerKind::Dot3,
                reason: "length field denotes an EtherType",
            }
            .into());
        }
        if usize::from(length) > cursor.remaining() {
            return Err(MalformedError {
                layer: LayerKind::Dot3,
                reason: "length field exceeds available data",
            }
            .into());
        }
        let payload = cursor.read_slice(length.into())?;
        let padding = cursor.rest().to_vec();
        let inner = if payload.is_empty() {
            None
        } else if payload.starts_with(&[Snap::DSAP, Snap::SSAP, Snap::CONTROL]) {
            Some(Box::new(Layer::Snap(Snap::dissect(payload)?)))
        } else {
            Some(Box::new(Layer::Llc(Llc::dissect(payload)?)))
        };
        Ok(Dot3 {
            destination,
            source,
            padding,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Dot3::LEN
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
        let payload_len = self.inner.as_deref().map_or(0, Layer::size);
        if payload_len > usize::from(Dot3::MAX_LENGTH_FIELD) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Dot3,
                field: "length",
                actual: payload_len,
                max: Dot3::MAX_LENGTH_FIELD.into(),
            });
        }
        let mut cursor = WriteCursor::new(LayerKind::Dot3, buf);
        cursor.write_mac(self.destination)?;
        cursor.write_mac(self.source)?;
        cursor.write_u16(payload_len as u16)?;
        if !self.padding.is_empty() {
            let end = buf.len();
            buf[end - self.padding.len()..].copy_from_slice(&self.padding);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_with_snap() {
        let frame = Dot3::new(MacAddr::BROADCAST, MacAddr::new([1, 2, 3, 4, 5, 6]))
            / Snap::new()
            / Ipv4::new([1, 1, 1, 1].into(), [2, 2, 2, 2].into(), 64);
        let bytes = frame.serialize().unwrap();
        // length field covers SNAP + IPv4
        assert_eq!([0, 28], [bytes[12], bytes[13]]);
        let dissected = Dot3::dissect(&bytes).unwrap();
        assert_eq!(LayerKind::Snap, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn ether_type_value_is_rejected() {
        let mut bytes = [0u8; 20];
        bytes[12] = 0x08; // 0x0800, an EtherType
        assert!(matches!(
            Dot3::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }

    #[test]
    fn length_bigger_than_data_is_rejected() {
        let mut bytes = [0u8; 16];
        bytes[13] = 100;
        assert!(matches!(
            Dot3::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
