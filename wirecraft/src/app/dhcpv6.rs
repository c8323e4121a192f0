use crate::err::{DissectError, MalformedError, OptionError, SerializeError};
use crate::*;

/// DHCPv6 message types.
pub mod dhcpv6_message_type {
    pub const SOLICIT: u8 = 1;
    pub const ADVERTISE: u8 = 2;
    pub const REQUEST: u8 = 3;
    pub const CONFIRM: u8 = 4;
    pub const RENEW: u8 = 5;
    pub const REBIND: u8 = 6;
    pub const REPLY: u8 = 7;
    pub const RELEASE: u8 = 8;
    pub const DECLINE: u8 = 9;
    pub const RECONFIGURE: u8 = 10;
    pub const INFORMATION_REQUEST: u8 = 11;
}

/// DHCPv6 option codes (subset of the IANA registry).
pub mod dhcpv6_option {
    pub const CLIENT_ID: u16 = 1;
    pub const SERVER_ID: u16 = 2;
    pub const IA_NA: u16 = 3;
    pub const ORO: u16 = 6;
    pub const ELAPSED_TIME: u16 = 8;
    pub const STATUS_CODE: u16 = 13;
    pub const DNS_SERVERS: u16 = 23;
}

/// DHCPv6 message (RFC 8415): message type, transaction id and a list
/// of 16 bit type / 16 bit length options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dhcpv6 {
    /// Message type (`dhcpv6_message_type` constants).
    pub message_type: u8,

    /// Transaction id (3 bytes).
    pub transaction_id: [u8; 3],

    pub options: Vec<TlvOption<u16>>,

    pub inner: Option<Box<Layer>>,
}

impl Dhcpv6 {
    /// Length of the fixed header in bytes.
    pub const MIN_LEN: usize = 4;

    pub fn new(message_type: u8, transaction_id: [u8; 3]) -> Dhcpv6 {
        Dhcpv6 {
            message_type,
            transaction_id,
            options: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dhcpv6, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dhcpv6, bytes);
        let message_type = cursor.read_u8()?;
        let transaction_id = cursor.read_array::<3>()?;
        let mut options = Vec::new();
        while !cursor.is_empty() {
            let id = cursor.read_u16()?;
            let len = cursor.read_u16()?;
            if usize::from(len) > cursor.remaining() {
                return Err(MalformedError {
                    layer: LayerKind::Dhcpv6,
                    reason: "option length exceeds available data",
                }
                .into());
            }
            options.push(TlvOption::new(id, cursor.read_slice(len.into())?.to_vec()));
        }
        Ok(Dhcpv6 {
            message_type,
            transaction_id,
            options,
            inner: None,
        })
    }

    pub fn header_size(&self) -> usize {
        Dhcpv6::MIN_LEN
            + self
                .options
                .iter()
                .map(|option| 4 + option.data.len())
                .sum::<usize>()
    }

    /// Find an option by its code.
    pub fn option(&self, id: u16) -> Result<&TlvOption<u16>, OptionError> {
        crate::options::find_option(&self.options, id, LayerKind::Dhcpv6)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Dhcpv6, buf);
        cursor.write_u8(self.message_type)?;
        cursor.write_slice(&self.transaction_id)?;
        for option in &self.options {
            if option.data.len() > usize::from(u16::MAX) {
                return Err(SerializeError::ValueTooBig {
                    layer: LayerKind::Dhcpv6,
                    field: "option_length",
                    actual: option.data.len(),
                    max: u16::MAX.into(),
                });
            }
            cursor.write_u16(option.id)?;
            cursor.write_u16(option.data.len() as u16)?;
            cursor.write_slice(&option.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn solicit_round_trip() {
        let mut solicit = Dhcpv6::new(dhcpv6_message_type::SOLICIT, [0x12, 0x34, 0x56]);
        solicit.options.push(TlvOption::new(
            dhcpv6_option::CLIENT_ID,
            vec![0, 1, 0, 1, 1, 2, 3, 4],
        ));
        solicit
            .options
            .push(TlvOption::new(dhcpv6_option::ELAPSED_TIME, vec![0, 0]));

        let bytes = Layer::from(solicit.clone()).serialize().unwrap();
        assert_eq!(4 + 12 + 6, bytes.len());

        let dissected = Dhcpv6::dissect(&bytes).unwrap();
        assert_eq!(solicit, dissected);
        assert_eq!(
            vec![0, 0],
            dissected.option(dhcpv6_option::ELAPSED_TIME).unwrap().data
        );
    }

    #[test]
    fn truncated_option() {
        let bytes = [1, 0x12, 0x34, 0x56, 0, 1, 0, 10, 0];
        assert!(matches!(
            Dhcpv6::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
