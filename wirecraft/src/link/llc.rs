use crate::err::{DissectError, SerializeError};
use crate::*;

/// IEEE 802.2 logical link control header.
///
/// Unnumbered frames carry a single control byte, information and
/// supervisory frames a second one (`control_ext`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Llc {
    /// Destination service access point.
    pub dsap: u8,

    /// Source service access point.
    pub ssap: u8,

    /// First control byte.
    pub control: u8,

    /// Second control byte of information/supervisory format frames.
    pub control_ext: Option<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Llc {
    /// Control value of unnumbered information frames.
    pub const CONTROL_UI: u8 = 0x03;

    pub fn new(dsap: u8, ssap: u8) -> Llc {
        Llc {
            dsap,
            ssap,
            control: Llc::CONTROL_UI,
            control_ext: None,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Llc, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Llc, bytes);
        let dsap = cursor.read_u8()?;
        let ssap = cursor.read_u8()?;
        let control = cursor.read_u8()?;
        // unnumbered frames (low two bits 11) use a one byte control field
        let control_ext = if control & 0b11 == 0b11 {
            None
        } else {
            Some(cursor.read_u8()?)
        };
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(cursor.rest().to_vec()))))
        };
        Ok(Llc {
            dsap,
            ssap,
            control,
            control_ext,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        if self.control_ext.is_some() {
            4
        } else {
            3
        }
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Llc, buf);
        cursor.write_u8(self.dsap)?;
        cursor.write_u8(self.ssap)?;
        cursor.write_u8(self.control)?;
        if let Some(ext) = self.control_ext {
            cursor.write_u8(ext)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unnumbered_round_trip() {
        let llc = Llc::new(0x42, 0x42) / RawPayload::new(vec![1, 2, 3]);
        let bytes = llc.serialize().unwrap();
        assert_eq!(6, bytes.len());
        let dissected = Llc::dissect(&bytes).unwrap();
        assert_eq!(0x42, dissected.dsap);
        assert_eq!(None, dissected.control_ext);
    }

    #[test]
    fn sequenced_control_uses_two_bytes() {
        let bytes = [0x42, 0x43, 0x00, 0x7f, 0xaa];
        let dissected = Llc::dissect(&bytes).unwrap();
        assert_eq!(Some(0x7f), dissected.control_ext);
        assert_eq!(4, dissected.header_size());
    }
}
