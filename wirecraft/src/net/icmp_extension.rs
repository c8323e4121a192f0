use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;

/// One object of an RFC 4884 ICMP extension structure.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IcmpExtensionObject {
    /// Object class (1 = MPLS label stack).
    pub class: u8,

    /// Class specific type.
    pub object_type: u8,

    pub payload: Vec<u8>,
}

impl IcmpExtensionObject {
    /// Length of the object header in bytes.
    pub const HEADER_LEN: usize = 4;

    /// Class of MPLS label stack objects.
    pub const CLASS_MPLS: u8 = 1;

    /// Type of MPLS label stack objects (inside class 1).
    pub const TYPE_MPLS_INCOMING: u8 = 1;

    pub fn new(class: u8, object_type: u8, payload: Vec<u8>) -> IcmpExtensionObject {
        IcmpExtensionObject {
            class,
            object_type,
            payload,
        }
    }

    /// Build an object carrying an MPLS label stack.
    pub fn from_mpls_stack(stack: &[Mpls]) -> Result<IcmpExtensionObject, SerializeError> {
        let mut payload = Vec::with_capacity(stack.len() * Mpls::LEN);
        for (index, entry) in stack.iter().enumerate() {
            let mut label = entry.clone();
            label.inner = None;
            label.bottom_of_stack = index + 1 == stack.len();
            payload.extend_from_slice(&Layer::from(label).serialize()?);
        }
        Ok(IcmpExtensionObject::new(
            IcmpExtensionObject::CLASS_MPLS,
            IcmpExtensionObject::TYPE_MPLS_INCOMING,
            payload,
        ))
    }

    /// Decode the payload as an MPLS label stack.
    pub fn mpls_stack(&self) -> Result<Vec<Mpls>, DissectError> {
        if self.class != IcmpExtensionObject::CLASS_MPLS
            || self.object_type != IcmpExtensionObject::TYPE_MPLS_INCOMING
        {
            return Err(MalformedError {
                layer: LayerKind::Mpls,
                reason: "object is not an mpls label stack",
            }
            .into());
        }
        let mut stack = Vec::new();
        let mut cursor = ReadCursor::new(LayerKind::Mpls, &self.payload);
        while !cursor.is_empty() {
            let entry = cursor.read_u32()?;
            stack.push(Mpls {
                label: entry >> 12,
                traffic_class: ((entry >> 9) & 0b111) as u8,
                bottom_of_stack: 0 != entry & 0x100,
                ttl: (entry & 0xff) as u8,
                inner: None,
            });
        }
        Ok(stack)
    }

    pub fn len(&self) -> usize {
        IcmpExtensionObject::HEADER_LEN + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// RFC 4884 ICMP extension structure: a 4 byte header followed by a list
/// of objects, appended after the original-datagram part of an ICMP
/// error message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IcmpExtensions {
    /// Structure version, 2 on the wire.
    pub version: u8,

    /// Reserved bits (12 bit).
    pub reserved: u16,

    /// Structure checksum as dissected. Recomputed at serialization.
    pub checksum: u16,

    pub objects: Vec<IcmpExtensionObject>,
}

impl Default for IcmpExtensions {
    fn default() -> IcmpExtensions {
        IcmpExtensions {
            version: 2,
            reserved: 0,
            checksum: 0,
            objects: Vec::new(),
        }
    }
}

impl IcmpExtensions {
    /// Length of the structure header in bytes.
    pub const HEADER_LEN: usize = 4;

    /// ICMP error payloads shorter than this are zero padded before the
    /// extension structure starts.
    pub const MINIMUM_ORIGINAL_DATAGRAM_LEN: usize = 128;

    /// Convenience constructor for a structure holding a single MPLS
    /// label stack object.
    pub fn with_mpls_stack(stack: &[Mpls]) -> Result<IcmpExtensions, SerializeError> {
        Ok(IcmpExtensions {
            objects: vec![IcmpExtensionObject::from_mpls_stack(stack)?],
            ..Default::default()
        })
    }

    pub fn dissect(bytes: &[u8]) -> Result<IcmpExtensions, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Icmpv4, bytes);
        let version_reserved = cursor.read_u16()?;
        let checksum = cursor.read_u16()?;
        let mut objects = Vec::new();
        while !cursor.is_empty() {
            let length = usize::from(cursor.read_u16()?);
            let class = cursor.read_u8()?;
            let object_type = cursor.read_u8()?;
            let payload_len =
                length
                    .checked_sub(IcmpExtensionObject::HEADER_LEN)
                    .ok_or(MalformedError {
                        layer: LayerKind::Icmpv4,
                        reason: "extension object length smaller than its header",
                    })?;
            let payload = cursor.read_slice(payload_len)?.to_vec();
            objects.push(IcmpExtensionObject {
                class,
                object_type,
                payload,
            });
        }
        Ok(IcmpExtensions {
            version: (version_reserved >> 12) as u8,
            reserved: version_reserved & 0x0fff,
            checksum,
            objects,
        })
    }

    /// Serialized length of the whole structure in bytes.
    pub fn len(&self) -> usize {
        IcmpExtensions::HEADER_LEN + self.objects.iter().map(IcmpExtensionObject::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Serialize the structure into `buf` (which must be exactly
    /// [`IcmpExtensions::len`] bytes), computing the internal checksum.
    pub(crate) fn write(&self, buf: &mut [u8]) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Icmpv4, buf);
        cursor.write_u16((u16::from(self.version) << 12) | (self.reserved & 0x0fff))?;
        cursor.write_u16(0)?; // checksum patched below
        for object in &self.objects {
            if object.len() > usize::from(u16::MAX) {
                return Err(SerializeError::ValueTooBig {
                    layer: LayerKind::Icmpv4,
                    field: "extension_object_length",
                    actual: object.len(),
                    max: u16::MAX.into(),
                });
            }
            cursor.write_u16(object.len() as u16)?;
            cursor.write_u8(object.class)?;
            cursor.write_u8(object.object_type)?;
            cursor.write_slice(&object.payload)?;
        }
        let checksum = checksum::Sum16BitWords::new()
            .add_slice(buf)
            .ones_complement()
            .to_be();
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mpls_stack_round_trip() {
        let stack = [Mpls {
            label: 10012,
            traffic_class: 0,
            bottom_of_stack: true,
            ttl: 15,
            inner: None,
        }];
        let extensions = IcmpExtensions::with_mpls_stack(&stack).unwrap();
        assert_eq!(4 + 4 + 4, extensions.len());

        let mut buf = vec![0u8; extensions.len()];
        extensions.write(&mut buf).unwrap();
        // version 2 in the upper nibble
        assert_eq!(0x20, buf[0]);

        let dissected = IcmpExtensions::dissect(&buf).unwrap();
        assert_eq!(2, dissected.version);
        assert_eq!(1, dissected.objects.len());
        let recovered = dissected.objects[0].mpls_stack().unwrap();
        assert_eq!(stack[0], recovered[0]);

        // the embedded checksum must verify over the structure
        assert_eq!(
            0,
            checksum::Sum16BitWords::new()
                .add_slice(&buf)
                .ones_complement()
        );
    }

    #[test]
    fn object_length_validation() {
        // object claims a 2 byte total length, smaller than its header
        let bytes = [0x20, 0x00, 0x00, 0x00, 0x00, 0x02, 0x01, 0x01];
        assert!(matches!(
            IcmpExtensions::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
