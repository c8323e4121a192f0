use crate::err::{DissectError, SerializeError};
use crate::*;

/// Address families used by the BSD loopback encapsulation.
pub mod loopback_family {
    pub const INET: u32 = 2;
    pub const INET6_BSD: u32 = 24;
    pub const INET6_FREEBSD: u32 = 28;
    pub const INET6_DARWIN: u32 = 30;
}

/// BSD/OSX loopback encapsulation: a 4 byte address family prefix.
///
/// The family is written in the byte order of the capturing host; this
/// codec reads and writes little endian, which is what the vast majority
/// of captures contain.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Loopback {
    /// Address family of the payload (`loopback_family` constants).
    pub family: u32,

    pub inner: Option<Box<Layer>>,
}

impl Loopback {
    /// Length of the serialized header in bytes.
    pub const LEN: usize = 4;

    pub fn new() -> Loopback {
        Loopback {
            family: loopback_family::INET,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Loopback, DissectError> {
        use self::loopback_family::*;
        let mut cursor = ReadCursor::new(LayerKind::Loopback, bytes);
        let family = cursor.read_u32_le()?;
        let inner = if cursor.is_empty() {
            None
        } else {
            let rest = cursor.rest();
            let layer = match family {
                INET => Layer::Ipv4(Ipv4::dissect(rest)?),
                INET6_BSD | INET6_FREEBSD | INET6_DARWIN => Layer::Ipv6(Ipv6::dissect(rest)?),
                _ => Layer::Raw(RawPayload::new(rest.to_vec())),
            };
            Some(Box::new(layer))
        };
        Ok(Loopback { family, inner })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Loopback::LEN
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let family = match (self.family, self.inner.as_deref()) {
            (0, Some(Layer::Ipv4(_))) => loopback_family::INET,
            (0, Some(Layer::Ipv6(_))) => loopback_family::INET6_BSD,
            (family, _) => family,
        };
        WriteCursor::new(LayerKind::Loopback, buf).write_u32_le(family)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let packet = Loopback::new() / Ipv4::new([127, 0, 0, 1].into(), [127, 0, 0, 1].into(), 64);
        let bytes = packet.serialize().unwrap();
        assert_eq!([2, 0, 0, 0], bytes[..4]);
        let dissected = Loopback::dissect(&bytes).unwrap();
        assert_eq!(loopback_family::INET, dissected.family);
        assert_eq!(LayerKind::Ipv4, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn unknown_family_keeps_raw_payload() {
        let bytes = [9, 0, 0, 0, 0xde, 0xad];
        let dissected = Loopback::dissect(&bytes).unwrap();
        assert_eq!(9, dissected.family);
        assert_eq!(LayerKind::Raw, dissected.inner.as_deref().unwrap().kind());
    }
}
