use crate::err::{DissectError, SerializeError};
use crate::*;

/// A single MPLS label stack entry.
///
/// Entries are stackable by chaining multiple `Mpls` layers; the bottom
/// of stack bit of the last entry is forced while serializing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mpls {
    /// Label value (20 bit).
    pub label: u32,

    /// Traffic class (3 bit, formerly EXP).
    pub traffic_class: u8,

    /// Bottom of stack bit. Forced to 1 at serialization when the inner
    /// layer is not another MPLS entry.
    pub bottom_of_stack: bool,

    /// Time to live.
    pub ttl: u8,

    pub inner: Option<Box<Layer>>,
}

impl Mpls {
    /// Length of the serialized label entry in bytes.
    pub const LEN: usize = 4;

    pub fn new(label: u32, ttl: u8) -> Mpls {
        Mpls {
            label,
            traffic_class: 0,
            bottom_of_stack: false,
            ttl,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Mpls, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Mpls, bytes);
        let entry = cursor.read_u32()?;
        let bottom_of_stack = 0 != entry & 0x100;
        let inner = if cursor.is_empty() {
            None
        } else if bottom_of_stack {
            // the last entry carries the payload; guess IPv4/IPv6 from
            // the version nibble
            let rest = cursor.rest();
            let layer = match rest[0] >> 4 {
                4 => Layer::Ipv4(Ipv4::dissect(rest)?),
                6 => Layer::Ipv6(Ipv6::dissect(rest)?),
                _ => Layer::Raw(RawPayload::new(rest.to_vec())),
            };
            Some(Box::new(layer))
        } else {
            Some(Box::new(Layer::Mpls(Mpls::dissect(cursor.rest())?)))
        };
        Ok(Mpls {
            label: entry >> 12,
            traffic_class: ((entry >> 9) & 0b111) as u8,
            bottom_of_stack,
            ttl: (entry & 0xff) as u8,
            inner,
        })
    }

    /// Decode a label entry from the payload of an ICMP extension object
    /// (class 1 / type 1 carries an MPLS label stack).
    pub fn from_icmp_extension(object: &IcmpExtensionObject) -> Result<Mpls, DissectError> {
        Mpls::dissect(&object.payload)
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Mpls::LEN
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let bottom = match self.inner.as_deref() {
            Some(Layer::Mpls(_)) => false,
            Some(_) => true,
            None => self.bottom_of_stack,
        };
        let entry = ((self.label & 0xf_ffff) << 12)
            | (u32::from(self.traffic_class & 0b111) << 9)
            | if bottom { 0x100 } else { 0 }
            | u32::from(self.ttl);
        WriteCursor::new(LayerKind::Mpls, buf).write_u32(entry)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let entry = Mpls {
            label: 10012,
            traffic_class: 3,
            bottom_of_stack: true,
            ttl: 15,
            inner: None,
        };
        let bytes = Layer::from(entry.clone()).serialize().unwrap();
        assert_eq!(4, bytes.len());
        assert_eq!(entry, Mpls::dissect(&bytes).unwrap());
    }

    #[test]
    fn bottom_of_stack_forced_by_stacking() {
        let stack = Mpls::new(100, 64) / Mpls::new(200, 64);
        let bytes = stack.serialize().unwrap();
        let outer = Mpls::dissect(&bytes).unwrap();
        assert!(!outer.bottom_of_stack);
        match outer.inner.as_deref() {
            Some(Layer::Mpls(inner)) => {
                assert!(inner.bottom_of_stack);
                assert_eq!(200, inner.label);
            }
            other => panic!("expected inner mpls entry, got {:?}", other),
        }
    }

    #[test]
    fn ip_payload_recognized_by_version_nibble() {
        let stack = Mpls::new(7, 8) / Ipv4::new([1, 2, 3, 4].into(), [5, 6, 7, 8].into(), 64);
        let bytes = stack.serialize().unwrap();
        let outer = Mpls::dissect(&bytes).unwrap();
        assert!(outer.bottom_of_stack);
        assert_eq!(LayerKind::Ipv4, outer.inner.as_deref().unwrap().kind());
    }
}
