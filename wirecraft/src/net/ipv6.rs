use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;
use core::net::Ipv6Addr;

/// Header type numbers of the IPv6 extension chain.
pub mod ipv6_ext {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const DESTINATION_OPTIONS: u8 = 60;
}

/// One header of the IPv6 extension chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Ipv6Extension {
    /// Hop-by-hop options, routing or destination options header, kept
    /// with its raw content (the bytes after the common next-header /
    /// length prefix).
    Generic {
        /// Header type number (`ipv6_ext` constants).
        header_type: u8,
        /// Raw content. Its length plus the 2 byte prefix must be a
        /// multiple of 8.
        data: Vec<u8>,
    },

    /// Fragment header (fixed 8 bytes).
    Fragment {
        /// Offset of this fragment in 8 byte units.
        fragment_offset: u16,
        more_fragments: bool,
        identification: u32,
    },
}

impl Ipv6Extension {
    /// Header type number announcing this extension in the preceding
    /// next-header field.
    pub fn header_type(&self) -> u8 {
        match self {
            Ipv6Extension::Generic { header_type, .. } => *header_type,
            Ipv6Extension::Fragment { .. } => ipv6_ext::FRAGMENT,
        }
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Ipv6Extension::Generic { data, .. } => 2 + data.len(),
            Ipv6Extension::Fragment { .. } => 8,
        }
    }

    /// True if the serialized length is zero (never the case; present
    /// for the conventional `len`/`is_empty` pair).
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// IPv6 header (RFC 8200) with its extension header chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ipv6 {
    /// Traffic class (DSCP + ECN).
    pub traffic_class: u8,

    /// Flow label (20 bit).
    pub flow_label: u32,

    /// Protocol number of the payload *after* the extension chain. The
    /// next-header fields on the wire (fixed header & every extension)
    /// are re-derived from the chain while serializing; this value is
    /// the fallback when the inner layer's kind maps to no known
    /// protocol number.
    pub next_header: u8,

    pub hop_limit: u8,

    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,

    /// Extension headers between the fixed header and the payload.
    pub extensions: Vec<Ipv6Extension>,

    pub inner: Option<Box<Layer>>,
}

impl Ipv6 {
    /// Length of the fixed header in bytes.
    pub const MIN_LEN: usize = 40;

    pub fn new(source: Ipv6Addr, destination: Ipv6Addr, hop_limit: u8) -> Ipv6 {
        Ipv6 {
            traffic_class: 0,
            flow_label: 0,
            next_header: 0,
            hop_limit,
            source,
            destination,
            extensions: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Ipv6, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Ipv6, bytes);
        let first_word = cursor.read_u32()?;
        if first_word >> 28 != 6 {
            return Err(MalformedError {
                layer: LayerKind::Ipv6,
                reason: "version field is not 6",
            }
            .into());
        }
        let payload_length = cursor.read_u16()?;
        let next_header = cursor.read_u8()?;
        let hop_limit = cursor.read_u8()?;
        let source = cursor.read_ipv6_addr()?;
        let destination = cursor.read_ipv6_addr()?;
        if usize::from(payload_length) > cursor.remaining() {
            return Err(MalformedError {
                layer: LayerKind::Ipv6,
                reason: "payload length exceeds available data",
            }
            .into());
        }
        let payload = cursor.read_slice(payload_length.into())?;

        // walk the extension chain
        let mut extensions = Vec::new();
        let mut fragmented = false;
        let mut current = next_header;
        let mut ext_cursor = ReadCursor::new(LayerKind::Ipv6, payload);
        loop {
            match current {
                ipv6_ext::HOP_BY_HOP | ipv6_ext::ROUTING | ipv6_ext::DESTINATION_OPTIONS => {
                    let header_type = current;
                    current = ext_cursor.read_u8()?;
                    let ext_len = ext_cursor.read_u8()?;
                    let data = ext_cursor
                        .read_slice(usize::from(ext_len) * 8 + 6)?
                        .to_vec();
                    extensions.push(Ipv6Extension::Generic { header_type, data });
                }
                ipv6_ext::FRAGMENT => {
                    current = ext_cursor.read_u8()?;
                    ext_cursor.skip(1)?; // reserved
                    let offset_flags = ext_cursor.read_u16()?;
                    let identification = ext_cursor.read_u32()?;
                    let more_fragments = 0 != offset_flags & 1;
                    let fragment_offset = offset_flags >> 3;
                    fragmented = fragmented || more_fragments || fragment_offset != 0;
                    extensions.push(Ipv6Extension::Fragment {
                        fragment_offset,
                        more_fragments,
                        identification,
                    });
                }
                _ => break,
            }
        }

        let rest = ext_cursor.rest();
        let inner = if rest.is_empty() {
            None
        } else if fragmented {
            Some(Box::new(Layer::Raw(RawPayload::new(rest.to_vec()))))
        } else {
            Some(Box::new(layer_from_ip_number(current, rest)?))
        };

        Ok(Ipv6 {
            traffic_class: ((first_word >> 20) & 0xff) as u8,
            flow_label: first_word & 0xf_ffff,
            // the final next-header value identifies the payload; the
            // ones on the wire are re-derived while serializing
            next_header: current,
            hop_limit,
            source,
            destination,
            extensions,
            inner,
        })
    }

    fn extensions_len(&self) -> usize {
        self.extensions.iter().map(Ipv6Extension::len).sum()
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Ipv6::MIN_LEN + self.extensions_len()
    }

    /// True if a fragment extension header with an offset or the
    /// more-fragments flag is present.
    pub fn is_fragmenting_payload(&self) -> bool {
        self.extensions.iter().any(|ext| match ext {
            Ipv6Extension::Fragment {
                fragment_offset,
                more_fragments,
                ..
            } => *more_fragments || *fragment_offset != 0,
            _ => false,
        })
    }

    /// The next-header value identifying the payload after the last
    /// extension header.
    fn payload_protocol(&self) -> u8 {
        self.inner
            .as_deref()
            .and_then(ip_number_for_layer)
            .unwrap_or(self.next_header)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let payload_len = buf.len() - Ipv6::MIN_LEN;
        if payload_len > usize::from(u16::MAX) {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Ipv6,
                field: "payload_length",
                actual: payload_len,
                max: u16::MAX.into(),
            });
        }

        // the fixed header announces the first extension, each extension
        // announces the next one, the last one the payload protocol
        let first_next = self
            .extensions
            .first()
            .map(Ipv6Extension::header_type)
            .unwrap_or_else(|| self.payload_protocol());

        let mut cursor = WriteCursor::new(LayerKind::Ipv6, buf);
        cursor.write_u32(
            (6u32 << 28) | (u32::from(self.traffic_class) << 20) | (self.flow_label & 0xf_ffff),
        )?;
        cursor.write_u16(payload_len as u16)?;
        cursor.write_u8(first_next)?;
        cursor.write_u8(self.hop_limit)?;
        cursor.write_ipv6_addr(self.source)?;
        cursor.write_ipv6_addr(self.destination)?;

        for (index, extension) in self.extensions.iter().enumerate() {
            let next = self
                .extensions
                .get(index + 1)
                .map(Ipv6Extension::header_type)
                .unwrap_or_else(|| self.payload_protocol());
            match extension {
                Ipv6Extension::Generic { data, .. } => {
                    if (data.len() + 2) % 8 != 0 {
                        return Err(SerializeError::ValueTooBig {
                            layer: LayerKind::Ipv6,
                            field: "extension_length",
                            actual: data.len() + 2,
                            max: (data.len() + 2) / 8 * 8,
                        });
                    }
                    cursor.write_u8(next)?;
                    cursor.write_u8(((data.len() + 2) / 8 - 1) as u8)?;
                    cursor.write_slice(data)?;
                }
                Ipv6Extension::Fragment {
                    fragment_offset,
                    more_fragments,
                    identification,
                } => {
                    cursor.write_u8(next)?;
                    cursor.write_u8(0)?;
                    cursor.write_u16(
                        ((*fragment_offset & 0x1fff) << 3) | if *more_fragments { 1 } else { 0 },
                    )?;
                    cursor.write_u32(*identification)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        let mut cursor = ReadCursor::new(LayerKind::Ipv6, bytes);
        if cursor.skip(8).is_err() {
            return false;
        }
        let (source, destination) = match (cursor.read_ipv6_addr(), cursor.read_ipv6_addr()) {
            (Ok(source), Ok(destination)) => (source, destination),
            _ => return false,
        };
        if source != self.destination || destination != self.source {
            return false;
        }
        match (self.inner.as_deref(), bytes.get(Ipv6::MIN_LEN..)) {
            (Some(inner), Some(payload)) => inner.matches_response(payload),
            (None, _) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn addr(last: u8) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets[0] = 0xfe;
        octets[1] = 0x80;
        octets[15] = last;
        Ipv6Addr::from(octets)
    }

    #[test]
    fn round_trip() {
        let packet = Ipv6::new(addr(1), addr(2), 64)
            / Udp::new(1000, 2000)
            / RawPayload::new(vec![1, 2, 3]);
        let bytes = packet.serialize().unwrap();
        assert_eq!(40 + 8 + 3, bytes.len());
        assert_eq!(0x60, bytes[0]);
        // payload length & next header derived
        assert_eq!([0x00, 0x0b], [bytes[4], bytes[5]]);
        assert_eq!(ip_number::UDP, bytes[6]);

        let dissected = Ipv6::dissect(&bytes).unwrap();
        assert_eq!(addr(1), dissected.source);
        assert_eq!(LayerKind::Udp, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn extension_chain_round_trip() {
        let packet = Ipv6 {
            extensions: vec![
                Ipv6Extension::Generic {
                    header_type: ipv6_ext::HOP_BY_HOP,
                    data: vec![1, 4, 0, 0, 0, 0], // router alert option padded
                },
                Ipv6Extension::Fragment {
                    fragment_offset: 0,
                    more_fragments: false,
                    identification: 0xdead_beef,
                },
            ],
            ..Ipv6::new(addr(1), addr(2), 64)
        } / Udp::new(53, 53);
        let bytes = packet.serialize().unwrap();
        assert_eq!(40 + 8 + 8 + 8, bytes.len());
        // fixed header announces hop-by-hop
        assert_eq!(ipv6_ext::HOP_BY_HOP, bytes[6]);
        // hop-by-hop announces the fragment header, which announces udp
        assert_eq!(ipv6_ext::FRAGMENT, bytes[40]);
        assert_eq!(ip_number::UDP, bytes[48]);

        let dissected = Ipv6::dissect(&bytes).unwrap();
        assert_eq!(2, dissected.extensions.len());
        assert!(!dissected.is_fragmenting_payload());
        assert_eq!(LayerKind::Udp, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn fragmented_payload_stays_raw() {
        let packet = Ipv6 {
            extensions: vec![Ipv6Extension::Fragment {
                fragment_offset: 100,
                more_fragments: true,
                identification: 7,
            }],
            ..Ipv6::new(addr(1), addr(2), 64)
        } / RawPayload::new(vec![0u8; 16]);
        let bytes = packet.serialize().unwrap();
        let dissected = Ipv6::dissect(&bytes).unwrap();
        assert!(dissected.is_fragmenting_payload());
        assert_eq!(LayerKind::Raw, dissected.inner.as_deref().unwrap().kind());
    }

    #[test]
    fn bad_version() {
        let bytes = [0x40u8; 40];
        assert!(matches!(
            Ipv6::dissect(&bytes),
            Err(DissectError::Malformed(_))
        ));
    }
}
