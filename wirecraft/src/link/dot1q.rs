use crate::err::{DissectError, SerializeError};
use crate::*;

/// 802.1Q VLAN tagging header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dot1Q {
    /// Priority code point (3 bit).
    pub priority: u8,

    /// Drop eligible indicator / canonical format indicator (1 bit).
    pub cfi: bool,

    /// VLAN identifier (12 bit).
    pub vlan_id: u16,

    /// `EtherType` of the payload. When left at 0 the value is derived
    /// from the inner layer's kind while serializing.
    pub ether_type: u16,

    /// Append a zero trailer so the Ethernet frame reaches its 60 octet
    /// minimum. Enabled on crafted tags, disabled on dissected ones
    /// (dissected frames carry their padding in the payload already).
    /// When tags are nested only the outermost one pads.
    pub append_padding: bool,

    pub inner: Option<Box<Layer>>,
}

impl Dot1Q {
    /// Length of the serialized tag in bytes.
    pub const LEN: usize = 4;

    /// Minimum Ethernet frame length (without FCS) minus the 14 byte
    /// Ethernet II header: the region below the Ethernet header must
    /// reach this size for the frame to be 60 octets long.
    const MIN_FRAME_REGION: usize = 46;

    pub fn new(vlan_id: u16) -> Dot1Q {
        Dot1Q {
            priority: 0,
            cfi: false,
            vlan_id,
            ether_type: 0,
            append_padding: true,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dot1Q, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dot1Q, bytes);
        let tci = cursor.read_u16()?;
        let ether_type = cursor.read_u16()?;
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(layer_from_ether_type(ether_type, cursor.rest())?))
        };
        Ok(Dot1Q {
            priority: (tci >> 13) as u8,
            cfi: 0 != tci & 0x1000,
            vlan_id: tci & 0x0fff,
            ether_type,
            append_padding: false,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Dot1Q::LEN
    }

    pub fn trailer_size(&self) -> usize {
        if !self.append_padding {
            return 0;
        }
        let region = Dot1Q::LEN + self.inner.as_deref().map_or(0, Layer::size);
        Dot1Q::MIN_FRAME_REGION.saturating_sub(region)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let ether_type = if self.ether_type != 0 {
            self.ether_type
        } else {
            match self.inner.as_deref() {
                // a nested tag is announced as provider bridging
                Some(Layer::Dot1Q(_)) => ether_type::PROVIDER_BRIDGING,
                Some(inner) => ether_type_for_layer(inner).unwrap_or(0),
                None => 0,
            }
        };
        let tci = (u16::from(self.priority) << 13)
            | if self.cfi { 0x1000 } else { 0 }
            | (self.vlan_id & 0x0fff);

        let mut cursor = WriteCursor::new(LayerKind::Dot1Q, buf);
        cursor.write_u16(tci)?;
        cursor.write_u16(ether_type)?;

        // zero the minimum-frame trailer at the end of the region
        let trailer = self.trailer_size();
        if trailer > 0 {
            let end = buf.len();
            buf[end - trailer..].fill(0);
        }
        Ok(())
    }

    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        let mut cursor = ReadCursor::new(LayerKind::Dot1Q, bytes);
        let tci = match cursor.read_u16() {
            Ok(tci) => tci,
            Err(_) => return false,
        };
        if tci & 0x0fff != self.vlan_id & 0x0fff {
            return false;
        }
        match self.inner.as_deref() {
            Some(inner) => inner.matches_response(&bytes[Dot1Q::LEN.min(bytes.len())..]),
            None => true,
        }
    }
}
