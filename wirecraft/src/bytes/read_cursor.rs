use crate::err::UnexpectedEndOfSliceError;
use crate::{LayerKind, MacAddr};
use core::net::{Ipv4Addr, Ipv6Addr};

/// Bounded reader over the bytes of a single layer.
///
/// All multi byte reads are big endian unless the method name carries an
/// `_le` suffix. Reading past the end of the slice fails with an
/// [`UnexpectedEndOfSliceError`] naming the layer that was being decoded.
#[derive(Clone, Debug)]
pub struct ReadCursor<'a> {
    layer: LayerKind,
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(layer: LayerKind, data: &'a [u8]) -> ReadCursor<'a> {
        ReadCursor {
            layer,
            data,
            pos: 0,
        }
    }

    /// Number of bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True if all bytes have been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], UnexpectedEndOfSliceError> {
        if self.remaining() < len {
            Err(UnexpectedEndOfSliceError {
                layer: self.layer,
                minimum_size: self.pos + len,
                actual_size: self.data.len(),
            })
        } else {
            let slice = &self.data[self.pos..self.pos + len];
            self.pos += len;
            Ok(slice)
        }
    }

    /// Read a fixed size byte array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], UnexpectedEndOfSliceError> {
        let slice = self.take(N)?;
        let mut result = [0u8; N];
        result.copy_from_slice(slice);
        Ok(result)
    }

    /// Read `len` bytes as a subslice.
    #[inline]
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], UnexpectedEndOfSliceError> {
        self.take(len)
    }

    /// Skip `len` bytes.
    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<(), UnexpectedEndOfSliceError> {
        self.take(len).map(|_| ())
    }

    /// Consume and return all remaining bytes.
    #[inline]
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    /// Return the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Result<u8, UnexpectedEndOfSliceError> {
        if self.is_empty() {
            Err(UnexpectedEndOfSliceError {
                layer: self.layer,
                minimum_size: self.pos + 1,
                actual_size: self.data.len(),
            })
        } else {
            Ok(self.data[self.pos])
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, UnexpectedEndOfSliceError> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, UnexpectedEndOfSliceError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, UnexpectedEndOfSliceError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, UnexpectedEndOfSliceError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16, UnexpectedEndOfSliceError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32, UnexpectedEndOfSliceError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u64_le(&mut self) -> Result<u64, UnexpectedEndOfSliceError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a 6 byte hardware address.
    #[inline]
    pub fn read_mac(&mut self) -> Result<MacAddr, UnexpectedEndOfSliceError> {
        Ok(MacAddr::from(self.read_array::<6>()?))
    }

    /// Read a 4 byte IPv4 address.
    #[inline]
    pub fn read_ipv4_addr(&mut self) -> Result<Ipv4Addr, UnexpectedEndOfSliceError> {
        Ok(Ipv4Addr::from(self.read_array::<4>()?))
    }

    /// Read a 16 byte IPv6 address.
    #[inline]
    pub fn read_ipv6_addr(&mut self) -> Result<Ipv6Addr, UnexpectedEndOfSliceError> {
        Ok(Ipv6Addr::from(self.read_array::<16>()?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads() {
        let data = [
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x01, 0x02, 0x03, 0x04,
        ];
        let mut cursor = ReadCursor::new(LayerKind::Raw, &data);
        assert_eq!(12, cursor.remaining());
        assert_eq!(0x12, cursor.peek_u8().unwrap());
        assert_eq!(0x12, cursor.read_u8().unwrap());
        assert_eq!(0x3456, cursor.read_u16().unwrap());
        assert_eq!(0x789a_bcde, cursor.read_u32().unwrap());
        assert_eq!(0x0201, cursor.read_u16_le().unwrap());
        assert_eq!(&[0x03, 0x04], cursor.rest());
        assert!(cursor.is_empty());
    }

    #[test]
    fn read_beyond_end() {
        let data = [0u8; 3];
        let mut cursor = ReadCursor::new(LayerKind::Udp, &data);
        cursor.read_u16().unwrap();
        assert_eq!(
            Err(UnexpectedEndOfSliceError {
                layer: LayerKind::Udp,
                minimum_size: 4,
                actual_size: 3,
            }),
            cursor.read_u16()
        );
        // the failed read must not consume anything
        assert_eq!(1, cursor.remaining());
    }

    #[test]
    fn typed_addresses() {
        let data = [
            1, 2, 3, 4, 5, 6, // mac
            192, 168, 0, 1, // ipv4
        ];
        let mut cursor = ReadCursor::new(LayerKind::Ethernet2, &data);
        assert_eq!(MacAddr::from([1, 2, 3, 4, 5, 6]), cursor.read_mac().unwrap());
        assert_eq!(
            Ipv4Addr::new(192, 168, 0, 1),
            cursor.read_ipv4_addr().unwrap()
        );
    }
}
