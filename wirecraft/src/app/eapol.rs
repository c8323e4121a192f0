use crate::err::{DissectError, SerializeError};
use crate::*;

/// EAPOL packet types (802.1X).
pub mod eapol_type {
    pub const EAP_PACKET: u8 = 0;
    pub const START: u8 = 1;
    pub const LOGOFF: u8 = 2;
    pub const KEY: u8 = 3;
    pub const ASF_ALERT: u8 = 4;
}

/// 802.1X EAPOL header. The body (EAP packet, key descriptor, ...) is
/// kept as an opaque inner payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Eapol {
    /// Protocol version (1 or 2).
    pub version: u8,

    /// Packet type (`eapol_type` constants).
    pub packet_type: u8,

    /// Captured bytes after the declared body length (minimum-frame
    /// padding). Serialized verbatim after the body.
    pub padding: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Eapol {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 4;

    pub fn new(version: u8, packet_type: u8) -> Eapol {
        Eapol {
            version,
            packet_type,
            padding: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Eapol, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Eapol, bytes);
        let version = cursor.read_u8()?;
        let packet_type = cursor.read_u8()?;
        let length = cursor.read_u16()?;
        let body = cursor.read_slice(usize::from(length).min(cursor.remaining()))?;
        let padding = cursor.rest().to_vec();
        let inner = if body.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(body.to_vec()))))
        };
        Ok(Eapol {
            version,
            packet_type,
            padding,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Eapol::LEN
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
        if !self.padding.is_empty() {
            let end = buf.len();
            buf[end - self.padding.len()..].copy_from_slice(&self.padding);
        }
        let body_len = buf.len() - Eapol::LEN - self.padding.len();
        if body_len > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Eapol,
                field: "length",
                actual: body_len,
                max: u16::MAX.into(),
            });
        }
        let mut cursor = WriteCursor::new(LayerKind::Eapol, buf);
        cursor.write_u8(self.version)?;
        cursor.write_u8(self.packet_type)?;
        cursor.write_u16(body_len as u16)
    }
}
