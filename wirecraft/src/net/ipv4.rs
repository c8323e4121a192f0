use crate::err::{DissectError, MalformedError, OptionError, SerializeError};
use crate::*;
use arrayvec::ArrayVec;
use core::net::Ipv4Addr;

/// Option kinds of the IPv4 header.
pub mod ipv4_option {
    /// End of option list (single byte).
    pub const EOL: u8 = 0;
    /// No operation (single byte).
    pub const NOP: u8 = 1;
    pub const SECURITY: u8 = 130;
    pub const LSRR: u8 = 131;
    pub const TIMESTAMP: u8 = 68;
    pub const RECORD_ROUTE: u8 = 7;
    pub const STREAM_ID: u8 = 136;
    pub const SSRR: u8 = 137;
    pub const ROUTER_ALERT: u8 = 148;
}

/// IPv4 header (RFC 791) with options.
///
/// Dependent fields are derived while serializing: the total length from
/// the chain size, the IHL from the options length, the protocol from
/// the inner layer's kind and the header checksum from the emitted
/// header. Fragmentation fields are preserved verbatim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ipv4 {
    /// Differentiated services code point (6 bit).
    pub dscp: u8,

    /// Explicit congestion notification (2 bit).
    pub ecn: u8,

    /// Datagram identification (shared by all fragments of a datagram).
    pub identification: u16,

    pub dont_fragment: bool,
    pub more_fragments: bool,

    /// Fragment offset in units of 8 bytes (13 bit).
    pub fragment_offset: u16,

    pub ttl: u8,

    /// IP protocol number of the payload. Overridden at serialization
    /// when the inner layer's kind maps to a known protocol number.
    pub protocol: u8,

    /// Header checksum as dissected. Recomputed at serialization.
    pub checksum: u16,

    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,

    /// Raw bytes of the options region (already padded to a multiple of
    /// 4). Use [`Ipv4::options`] / [`Ipv4::set_options`] for the TLV
    /// view.
    pub options: ArrayVec<u8, 40>,

    /// Captured bytes after the declared total length (Ethernet
    /// minimum-frame padding). Serialized verbatim after the payload.
    pub padding: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Ipv4 {
    /// Minimum length of the header in bytes.
    pub const MIN_LEN: usize = 20;

    /// Maximum length of the options region in bytes.
    pub const MAX_OPTIONS_LEN: usize = 40;

    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, ttl: u8) -> Ipv4 {
        Ipv4 {
            dscp: 0,
            ecn: 0,
            identification: 0,
            dont_fragment: false,
            more_fragments: false,
            fragment_offset: 0,
            ttl,
            protocol: 0,
            checksum: 0,
            source,
            destination,
            options: ArrayVec::new(),
            padding: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Ipv4, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Ipv4, bytes);
        let version_ihl = cursor.read_u8()?;
        if version_ihl >> 4 != 4 {
            return Err(MalformedError {
                layer: LayerKind::Ipv4,
                reason: "version field is not 4",
            }
            .into());
        }
        let header_len = usize::from(version_ihl & 0x0f) * 4;
        if header_len < Ipv4::MIN_LEN {
            return Err(MalformedError {
                layer: LayerKind::Ipv4,
                reason: "ihl smaller than the minimum header length",
            }
            .into());
        }
        let dscp_ecn = cursor.read_u8()?;
        let total_len = usize::from(cursor.read_u16()?);
        let identification = cursor.read_u16()?;
        let flags_frag = cursor.read_u16()?;
        let ttl = cursor.read_u8()?;
        let protocol = cursor.read_u8()?;
        let checksum = cursor.read_u16()?;
        let source = cursor.read_ipv4_addr()?;
        let destination = cursor.read_ipv4_addr()?;
        let options: ArrayVec<u8, 40> = cursor
            .read_slice(header_len - Ipv4::MIN_LEN)?
            .try_into()
            .expect("options region is at most 40 bytes");

        if total_len < header_len {
            return Err(MalformedError {
                layer: LayerKind::Ipv4,
                reason: "total length smaller than the header length",
            }
            .into());
        }
        if total_len > bytes.len() {
            return Err(MalformedError {
                layer: LayerKind::Ipv4,
                reason: "total length exceeds available data",
            }
            .into());
        }
        let payload = &bytes[header_len..total_len];
        let padding = bytes[total_len..].to_vec();

        let more_fragments = 0 != flags_frag & 0x2000;
        let fragment_offset = flags_frag & 0x1fff;
        let inner = if payload.is_empty() {
            None
        } else if more_fragments || fragment_offset != 0 {
            // fragment payloads can not be interpreted on their own
            Some(Box::new(Layer::Raw(RawPayload::new(payload.to_vec()))))
        } else {
            Some(Box::new(layer_from_ip_number(protocol, payload)?))
        };

        Ok(Ipv4 {
            dscp: dscp_ecn >> 2,
            ecn: dscp_ecn & 0b11,
            identification,
            dont_fragment: 0 != flags_frag & 0x4000,
            more_fragments,
            fragment_offset,
            ttl,
            protocol,
            checksum,
            source,
            destination,
            options,
            padding,
            inner,
        })
    }

    /// Internet header length in 4 byte words.
    #[inline]
    pub fn ihl(&self) -> u8 {
        (Ipv4::MIN_LEN as u8 + self.options.len() as u8) / 4
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Ipv4::MIN_LEN + self.options.len()
    }

    #[inline]
    pub fn trailer_size(&self) -> usize {
        self.padding.len()
    }

    /// True if this header describes a fragment of a larger datagram
    /// (either data is missing or there is a fragment offset).
    #[inline]
    pub fn is_fragmenting_payload(&self) -> bool {
        self.more_fragments || self.fragment_offset != 0
    }

    /// Fragment offset in bytes.
    #[inline]
    pub fn fragment_offset_bytes(&self) -> u32 {
        u32::from(self.fragment_offset) * 8
    }

    /// The options region decoded as TLV options. `EOL` terminates the
    /// list, `NOP` options are single bytes, every other option carries
    /// a one byte length that includes the two header bytes.
    pub fn options(&self) -> Result<Vec<TlvOption<u8>>, OptionError> {
        let mut result = Vec::new();
        let mut rest = &self.options[..];
        while let Some((&id, tail)) = rest.split_first() {
            match id {
                ipv4_option::EOL => break,
                ipv4_option::NOP => {
                    result.push(TlvOption::new(id, Vec::new()));
                    rest = tail;
                }
                _ => {
                    let (&len, tail) = tail.split_first().ok_or(OptionError::Malformed {
                        layer: LayerKind::Ipv4,
                        reason: "option is missing its length byte",
                    })?;
                    let data_len =
                        usize::from(len)
                            .checked_sub(2)
                            .ok_or(OptionError::Malformed {
                                layer: LayerKind::Ipv4,
                                reason: "option length smaller than its header",
                            })?;
                    if data_len > tail.len() {
                        return Err(OptionError::Malformed {
                            layer: LayerKind::Ipv4,
                            reason: "option length exceeds the options region",
                        });
                    }
                    result.push(TlvOption::new(id, tail[..data_len].to_vec()));
                    rest = &tail[data_len..];
                }
            }
        }
        Ok(result)
    }

    /// Replace the options region with the given TLV options, padding
    /// the encoded bytes to a multiple of 4.
    pub fn set_options(&mut self, options: &[TlvOption<u8>]) -> Result<(), SerializeError> {
        let mut encoded = Vec::new();
        for option in options {
            encoded.push(option.id);
            if option.id != ipv4_option::EOL && option.id != ipv4_option::NOP {
                encoded.push((option.data.len() + 2) as u8);
                encoded.extend_from_slice(&option.data);
            }
        }
        while encoded.len() % 4 != 0 {
            encoded.push(ipv4_option::EOL);
        }
        if encoded.len() > Ipv4::MAX_OPTIONS_LEN {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Ipv4,
                field: "options",
                actual: encoded.len(),
                max: Ipv4::MAX_OPTIONS_LEN,
            });
        }
        self.options = encoded[..].try_into().expect("length checked above");
        Ok(())
    }

    /// Find an option by its kind.
    pub fn option(&self, id: u8) -> Result<TlvOption<u8>, OptionError> {
        self.options()?
            .into_iter()
            .find(|option| option.id == id)
            .ok_or(OptionError::NotFound {
                layer: LayerKind::Ipv4,
                id: id.into(),
            })
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let header_len = self.header_size();
        let total_len = buf.len() - self.padding.len();
        if total_len > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Ipv4,
                field: "total_len",
                actual: total_len,
                max: u16::MAX.into(),
            });
        }
        let protocol = self
            .inner
            .as_deref()
            .and_then(ip_number_for_layer)
            .unwrap_or(self.protocol);
        let flags_frag = (self.fragment_offset & 0x1fff)
            | if self.dont_fragment { 0x4000 } else { 0 }
            | if self.more_fragments { 0x2000 } else { 0 };

        let mut cursor = WriteCursor::new(LayerKind::Ipv4, buf);
        cursor.write_u8(0x40 | self.ihl())?;
        cursor.write_u8((self.dscp << 2) | (self.ecn & 0b11))?;
        cursor.write_u16(total_len as u16)?;
        cursor.write_u16(self.identification)?;
        cursor.write_u16(flags_frag)?;
        cursor.write_u8(self.ttl)?;
        cursor.write_u8(protocol)?;
        cursor.write_u16(0)?; // checksum patched below
        cursor.write_ipv4_addr(self.source)?;
        cursor.write_ipv4_addr(self.destination)?;
        cursor.write_slice(&self.options)?;

        let checksum = checksum::Sum16BitWords::new()
            .add_slice(&buf[..header_len])
            .ones_complement()
            .to_be();
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());

        // captured-frame padding goes after the payload
        if !self.padding.is_empty() {
            let end = buf.len();
            buf[end - self.padding.len()..].copy_from_slice(&self.padding);
        }
        Ok(())
    }

    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        let mut cursor = ReadCursor::new(LayerKind::Ipv4, bytes);
        let header_len = match cursor.read_u8() {
            Ok(version_ihl) => usize::from(version_ihl & 0x0f) * 4,
            Err(_) => return false,
        };
        if cursor.skip(11).is_err() {
            return false;
        }
        let (source, destination) = match (cursor.read_ipv4_addr(), cursor.read_ipv4_addr()) {
            (Ok(source), Ok(destination)) => (source, destination),
            _ => return false,
        };
        if source != self.destination || destination != self.source {
            return false;
        }
        match (self.inner.as_deref(), bytes.get(header_len..)) {
            (Some(inner), Some(payload)) => inner.matches_response(payload),
            (None, _) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let packet = Ipv4 {
            identification: 0x1c46,
            dont_fragment: true,
            ttl: 64,
            source: [172, 16, 10, 99].into(),
            destination: [172, 16, 10, 12].into(),
            ..Ipv4::new([0, 0, 0, 0].into(), [0, 0, 0, 0].into(), 64)
        } / RawPayload::new(vec![0u8; 4]);
        let bytes = packet.serialize().unwrap();
        assert_eq!(24, bytes.len());
        assert_eq!(0x45, bytes[0]);
        assert_eq!([0x00, 0x18], [bytes[2], bytes[3]]);

        let dissected = Ipv4::dissect(&bytes).unwrap();
        assert_eq!([172, 16, 10, 99], dissected.source.octets());
        assert!(dissected.dont_fragment);
        assert_eq!(bytes, Layer::from(dissected).serialize().unwrap());
    }

    #[test]
    fn header_checksum_is_valid() {
        // known reference header from RFC examples
        let packet = Ipv4 {
            identification: 0x1c46,
            dont_fragment: true,
            protocol: ip_number::TCP,
            ttl: 64,
            source: [172, 16, 10, 99].into(),
            destination: [172, 16, 10, 12].into(),
            ..Ipv4::new([0, 0, 0, 0].into(), [0, 0, 0, 0].into(), 64)
        } / RawPayload::new(vec![0u8; 40]);
        let bytes = packet.serialize().unwrap();
        assert_eq!([0xb1, 0xe6], [bytes[10], bytes[11]]);

        // the ones' complement sum over the emitted header must verify
        let verify = checksum::Sum16BitWords::new()
            .add_slice(&bytes[..20])
            .ones_complement();
        assert_eq!(0, verify);
    }

    #[test]
    fn declared_length_validation() {
        let mut bytes = Layer::from(Ipv4::new(
            [1, 2, 3, 4].into(),
            [5, 6, 7, 8].into(),
            64,
        ))
        .serialize()
        .unwrap();

        // total length pointing beyond the captured bytes
        bytes[2] = 0x10;
        bytes[3] = 0x00;
        assert!(matches!(
            Ipv4::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));

        // total length smaller than the header
        bytes[2] = 0x00;
        bytes[3] = 0x10;
        assert!(matches!(
            Ipv4::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }

    #[test]
    fn fragment_payload_stays_raw() {
        let fragment = Ipv4 {
            more_fragments: true,
            protocol: ip_number::UDP,
            ..Ipv4::new([1, 1, 1, 1].into(), [2, 2, 2, 2].into(), 64)
        } / RawPayload::new(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let bytes = fragment.serialize().unwrap();
        let dissected = Ipv4::dissect(&bytes).unwrap();
        assert!(dissected.is_fragmenting_payload());
        assert_eq!(
            LayerKind::Raw,
            dissected.inner.as_deref().unwrap().kind()
        );
    }

    #[test]
    fn ethernet_padding_round_trips() {
        let mut bytes = Layer::from(
            Ipv4::new([1, 1, 1, 1].into(), [2, 2, 2, 2].into(), 64)
                / Udp::new(53, 53)
                / RawPayload::new(vec![7, 7]),
        )
        .serialize()
        .unwrap();
        bytes.extend_from_slice(&[0u8; 16]); // frame padding

        let dissected = Ipv4::dissect(&bytes).unwrap();
        assert_eq!(16, dissected.padding.len());
        assert_eq!(16, dissected.trailer_size());
        assert_eq!(bytes, Layer::from(dissected).serialize().unwrap());
    }

    #[test]
    fn options_tlv_view() {
        let mut header = Ipv4::new([1, 1, 1, 1].into(), [2, 2, 2, 2].into(), 64);
        header
            .set_options(&[
                TlvOption::new(ipv4_option::NOP, Vec::new()),
                TlvOption::new(ipv4_option::ROUTER_ALERT, vec![0, 0]),
            ])
            .unwrap();
        // 1 + 4 bytes padded to 8
        assert_eq!(8, header.options.len());
        assert_eq!(7, header.ihl());

        let options = header.options().unwrap();
        assert_eq!(2, options.len());
        assert_eq!(ipv4_option::NOP, options[0].id);
        assert_eq!(vec![0, 0], options[1].data);
        assert_eq!(
            vec![0u8, 0],
            header.option(ipv4_option::ROUTER_ALERT).unwrap().data
        );
        assert!(matches!(
            header.option(ipv4_option::TIMESTAMP),
            Err(OptionError::NotFound { .. })
        ));

        // round trip through bytes keeps the options region
        let bytes = Layer::from(header.clone()).serialize().unwrap();
        let dissected = Ipv4::dissect(&bytes).unwrap();
        assert_eq!(header.options, dissected.options);
    }
}
