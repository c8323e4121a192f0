use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// LLC + SNAP header (8 bytes) as carried in 802.3 and 802.11 frames.
///
/// The LLC part is fixed (dsap/ssap 0xaa, control 0x03); the SNAP part
/// contributes an OUI and an `EtherType` that dispatches the payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Snap {
    /// Organizationally unique identifier (0 for encapsulated Ethernet).
    pub oui: [u8; 3],

    /// `EtherType` of the payload. When left at 0 the value is derived
    /// from the inner layer's kind while serializing.
    pub ether_type: u16,

    pub inner: Option<Box<Layer>>,
}

impl Snap {
    /// Length of the serialized LLC + SNAP header in bytes.
    pub const LEN: usize = 8;

    pub const DSAP: u8 = 0xaa;
    pub const SSAP: u8 = 0xaa;
    pub const CONTROL: u8 = 0x03;

    pub fn new() -> Snap {
        Snap::default()
    }

    pub fn dissect(bytes: &[u8]) -> Result<Snap, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Snap, bytes);
        let dsap = cursor.read_u8()?;
        let ssap = cursor.read_u8()?;
        let control = cursor.read_u8()?;
        if dsap != Snap::DSAP || ssap != Snap::SSAP || control != Snap::CONTROL {
            return Err(MalformedError {
                layer: LayerKind::Snap,
                reason: "llc prefix is not aa:aa:03",
            }
            .into());
        }
        let oui = cursor.read_array::<3>()?;
        let ether_type = cursor.read_u16()?;
        let inner = if cursor.is_empty() {
            None
        } else if oui == [0, 0, 0] {
            Some(Box::new(layer_from_ether_type(ether_type, cursor.rest())?))
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(cursor.rest().to_vec()))))
        };
        Ok(Snap {
            oui,
            ether_type,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Snap::LEN
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
        let mut cursor = WriteCursor::new(LayerKind::Snap, buf);
        cursor.write_u8(Snap::DSAP)?;
        cursor.write_u8(Snap::SSAP)?;
        cursor.write_u8(Snap::CONTROL)?;
        cursor.write_slice(&self.oui)?;
        cursor.write_u16(ether_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let snap = Snap::new() / Arp::who_has(
            [10, 0, 0, 1].into(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            [10, 0, 0, 2].into(),
        );
        let bytes = snap.serialize().unwrap();
        assert_eq!([0xaa, 0xaa, 0x03, 0, 0, 0, 0x08, 0x06], bytes[..8]);
        let dissected = Snap::dissect(&bytes).unwrap();
        assert_eq!(LayerKind::Arp, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn bad_llc_prefix() {
        assert!(matches!(
            Snap::dissect(&[0xab, 0xaa, 0x03, 0, 0, 0, 0x08, 0x00]),
            Err(DissectError::Malformed(_))
        ));
    }
}
