use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// Per packet information (PPI) encapsulation.
///
/// PPI wraps a captured frame in a little endian header followed by a
/// list of TLV fields carrying capture metadata. The metadata does not
/// survive a round trip, so this layer is dissect-only: serializing it
/// fails with [`SerializeError::NotSerializable`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ppi {
    pub version: u8,
    pub flags: u8,

    /// Total length of the PPI header including all fields.
    pub length: u16,

    /// DLT of the wrapped frame.
    pub dlt: u32,

    /// Raw bytes of the TLV field area (kept opaque).
    pub field_data: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Ppi {
    /// Length of the fixed part of the header in bytes.
    pub const MIN_LEN: usize = 8;

    pub fn dissect(bytes: &[u8]) -> Result<Ppi, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Ppi, bytes);
        let version = cursor.read_u8()?;
        let flags = cursor.read_u8()?;
        let length = cursor.read_u16_le()?;
        let dlt = cursor.read_u32_le()?;
        if usize::from(length) < Ppi::MIN_LEN {
            return Err(MalformedError {
                layer: LayerKind::Ppi,
                reason: "declared header length smaller than the fixed header",
            }
            .into());
        }
        let field_data = cursor.read_slice(usize::from(length) - Ppi::MIN_LEN)?.to_vec();
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(dissect_dlt(dlt, cursor.rest())?))
        };
        Ok(Ppi {
            version,
            flags,
            length,
            dlt,
            field_data,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Ppi::MIN_LEN + self.field_data.len()
    }

    pub(crate) fn write(
        &self,
        _buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        Err(SerializeError::NotSerializable(LayerKind::Ppi))
    }
}
