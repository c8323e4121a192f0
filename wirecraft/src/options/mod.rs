use crate::err::OptionError;
use crate::LayerKind;

/// A generic TLV (type-length-value) option as carried by IPv4, TCP,
/// DHCP, DHCPv6, ICMPv6, 802.11 and PPPoE.
///
/// The option only stores its identifier and payload bytes. How the
/// length is encoded on the wire (absent for fixed size options, a one
/// byte count, a length including the option header, 8 byte units, ...)
/// differs per protocol and is owned by the enclosing layer's codec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TlvOption<Id> {
    /// Protocol specific option identifier.
    pub id: Id,

    /// Payload bytes of the option (without id & length fields).
    pub data: Vec<u8>,
}

impl<Id> TlvOption<Id>
where
    Id: Copy + Eq + Into<u32>,
{
    pub fn new(id: Id, data: Vec<u8>) -> TlvOption<Id> {
        TlvOption { id, data }
    }

    /// Payload interpreted as a single byte.
    pub fn as_u8(&self, layer: LayerKind) -> Result<u8, OptionError> {
        match self.data[..] {
            [value] => Ok(value),
            _ => Err(OptionError::Malformed {
                layer,
                reason: "option payload is not exactly 1 byte",
            }),
        }
    }

    /// Payload interpreted as a big endian u16.
    pub fn as_u16(&self, layer: LayerKind) -> Result<u16, OptionError> {
        match self.data[..] {
            [a, b] => Ok(u16::from_be_bytes([a, b])),
            _ => Err(OptionError::Malformed {
                layer,
                reason: "option payload is not exactly 2 bytes",
            }),
        }
    }

    /// Payload interpreted as a big endian u32.
    pub fn as_u32(&self, layer: LayerKind) -> Result<u32, OptionError> {
        match self.data[..] {
            [a, b, c, d] => Ok(u32::from_be_bytes([a, b, c, d])),
            _ => Err(OptionError::Malformed {
                layer,
                reason: "option payload is not exactly 4 bytes",
            }),
        }
    }

    /// Payload interpreted as a list of big endian u32 values.
    pub fn as_u32_list(&self, layer: LayerKind) -> Result<Vec<u32>, OptionError> {
        if self.data.len() % 4 != 0 {
            return Err(OptionError::Malformed {
                layer,
                reason: "option payload is not a multiple of 4 bytes",
            });
        }
        Ok(self
            .data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

/// Search a slice of options for the first one with the given id.
pub(crate) fn find_option<Id: Copy + Eq + Into<u32>>(
    options: &[TlvOption<Id>],
    id: Id,
    layer: LayerKind,
) -> Result<&TlvOption<Id>, OptionError> {
    options
        .iter()
        .find(|option| option.id == id)
        .ok_or(OptionError::NotFound {
            layer,
            id: id.into(),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_accessors() {
        let option = TlvOption::new(2u8, vec![0x12, 0x34]);
        assert_eq!(Ok(0x1234), option.as_u16(LayerKind::Tcp));
        assert!(option.as_u8(LayerKind::Tcp).is_err());
        assert!(option.as_u32(LayerKind::Tcp).is_err());

        let option = TlvOption::new(5u8, vec![0, 0, 1, 0, 0, 0, 2, 0]);
        assert_eq!(
            Ok(vec![0x100, 0x200]),
            option.as_u32_list(LayerKind::Tcp)
        );
    }

    #[test]
    fn find() {
        let options = [
            TlvOption::new(1u8, vec![]),
            TlvOption::new(8u8, vec![1, 2, 3, 4, 5, 6, 7, 8]),
        ];
        assert_eq!(8, find_option(&options, 8, LayerKind::Tcp).unwrap().id);
        assert_eq!(
            Err(OptionError::NotFound {
                layer: LayerKind::Tcp,
                id: 2,
            }),
            find_option(&options, 2, LayerKind::Tcp).map(|_| ())
        );
    }
}
