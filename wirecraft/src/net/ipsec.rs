use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// IPSec authentication header (RFC 4302).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IpsecAh {
    /// Protocol number of the payload as dissected. Re-derived from the
    /// inner layer while serializing.
    pub next_header: u8,

    /// Security parameters index.
    pub spi: u32,

    /// Sequence number.
    pub sequence: u32,

    /// Integrity check value (length must be a multiple of 4).
    pub icv: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl IpsecAh {
    /// Length of the header without the ICV in bytes.
    pub const MIN_LEN: usize = 12;

    pub fn dissect(bytes: &[u8]) -> Result<IpsecAh, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::IpsecAh, bytes);
        let next_header = cursor.read_u8()?;
        let payload_len = cursor.read_u8()?;
        cursor.skip(2)?; // reserved
        let spi = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;
        // payload_len is the header length in 4 byte words minus 2
        let header_len = (usize::from(payload_len) + 2) * 4;
        let icv_len = header_len
            .checked_sub(IpsecAh::MIN_LEN)
            .ok_or(MalformedError {
                layer: LayerKind::IpsecAh,
                reason: "payload length smaller than the fixed header",
            })?;
        let icv = cursor.read_slice(icv_len)?.to_vec();
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(layer_from_ip_number(next_header, cursor.rest())?))
        };
        Ok(IpsecAh {
            next_header,
            spi,
            sequence,
            icv,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        IpsecAh::MIN_LEN + self.icv.len()
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        if self.icv.len() % 4 != 0 {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::IpsecAh,
                field: "icv",
                actual: self.icv.len(),
                max: self.icv.len() / 4 * 4,
            });
        }
        let next_header = self
            .inner
            .as_deref()
            .and_then(ip_number_for_layer)
            .unwrap_or(self.next_header);
        let mut cursor = WriteCursor::new(LayerKind::IpsecAh, buf);
        cursor.write_u8(next_header)?;
        cursor.write_u8((self.header_size() / 4 - 2) as u8)?;
        cursor.write_u16(0)?;
        cursor.write_u32(self.spi)?;
        cursor.write_u32(self.sequence)?;
        cursor.write_slice(&self.icv)
    }
}

/// IPSec encapsulating security payload (RFC 4303).
///
/// Everything after the 8 byte prefix is encrypted and therefore kept as
/// an opaque raw payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IpsecEsp {
    /// Security parameters index.
    pub spi: u32,

    /// Sequence number.
    pub sequence: u32,

    pub inner: Option<Box<Layer>>,
}

impl IpsecEsp {
    /// Length of the cleartext prefix in bytes.
    pub const LEN: usize = 8;

    pub fn dissect(bytes: &[u8]) -> Result<IpsecEsp, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::IpsecEsp, bytes);
        let spi = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(cursor.rest().to_vec()))))
        };
        Ok(IpsecEsp {
            spi,
            sequence,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        IpsecEsp::LEN
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::IpsecEsp, buf);
        cursor.write_u32(self.spi)?;
        cursor.write_u32(self.sequence)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ah_round_trip() {
        let ah = IpsecAh {
            spi: 0x100,
            sequence: 32,
            icv: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            ..Default::default()
        } / Udp::new(4500, 4500);
        let bytes = ah.serialize().unwrap();
        // payload length field: (12 + 12) / 4 - 2 = 4
        assert_eq!(4, bytes[1]);
        assert_eq!(ip_number::UDP, bytes[0]);

        let dissected = IpsecAh::dissect(&bytes).unwrap();
        assert_eq!(12, dissected.icv.len());
        assert_eq!(LayerKind::Udp, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn esp_payload_is_opaque() {
        let esp = IpsecEsp {
            spi: 0xabcd,
            sequence: 1,
            inner: None,
        } / RawPayload::new(vec![0xde, 0xad]);
        let bytes = esp.serialize().unwrap();
        let dissected = IpsecEsp::dissect(&bytes).unwrap();
        assert_eq!(0xabcd, dissected.spi);
        assert_eq!(
            LayerKind::Raw,
            dissected.inner.as_deref().unwrap().kind()
        );
    }
}
