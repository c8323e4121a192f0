use crate::err::SerializeError;
use crate::{Layer, LayerKind, WriteCursor};

/// Opaque bytes terminating a layer chain.
///
/// Produced by dissection whenever no handler is known for a
/// next-protocol identifier or when a protocol's payload is not meant to
/// be interpreted (e.g. the encrypted part of an ESP packet).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawPayload {
    /// The raw bytes.
    pub data: Vec<u8>,

    /// Optional inner layer. Dissection never sets this, but crafted
    /// chains may continue below a raw blob (e.g. a tunnel header that
    /// has no dedicated layer type yet).
    pub inner: Option<Box<Layer>>,
}

impl RawPayload {
    pub fn new(data: Vec<u8>) -> RawPayload {
        RawPayload { data, inner: None }
    }

    /// Length of the raw bytes.
    #[inline]
    pub fn header_size(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Raw, buf);
        cursor.write_slice(&self.data)
    }

    /// Any payload counts as a response to raw data.
    pub(crate) fn matches_response(&self, _bytes: &[u8]) -> bool {
        true
    }
}

impl From<Vec<u8>> for RawPayload {
    fn from(data: Vec<u8>) -> RawPayload {
        RawPayload::new(data)
    }
}

impl From<&[u8]> for RawPayload {
    fn from(data: &[u8]) -> RawPayload {
        RawPayload::new(data.to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizes() {
        let raw = RawPayload::new(vec![1, 2, 3, 4]);
        assert_eq!(4, raw.header_size());

        let layer: Layer = raw.into();
        assert_eq!(4, layer.size());
        assert_eq!(vec![1, 2, 3, 4], layer.serialize().unwrap());
    }

    #[test]
    fn from_slice() {
        let raw: RawPayload = (&[9u8, 8, 7][..]).into();
        assert_eq!(vec![9, 8, 7], raw.data);
    }
}
