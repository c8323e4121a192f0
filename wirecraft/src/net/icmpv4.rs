use crate::err::{DissectError, SerializeError};
use crate::*;
use core::net::Ipv4Addr;

/// ICMPv4 message types.
pub mod icmpv4_type {
    pub const ECHO_REPLY: u8 = 0;
    pub const DEST_UNREACHABLE: u8 = 3;
    pub const SOURCE_QUENCH: u8 = 4;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
    pub const PARAM_PROBLEM: u8 = 12;
    pub const TIMESTAMP_REQUEST: u8 = 13;
    pub const TIMESTAMP_REPLY: u8 = 14;
    pub const ADDRESS_MASK_REQUEST: u8 = 17;
    pub const ADDRESS_MASK_REPLY: u8 = 18;
}

/// ICMPv4 message (RFC 792) with optional RFC 4884 extensions.
///
/// The 4 bytes after the checksum are kept raw (`rest`); typed accessors
/// interpret them per message type. The payload (echo data or the
/// embedded original datagram of error messages) is the raw inner layer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Icmpv4 {
    pub icmp_type: u8,
    pub code: u8,

    /// Checksum as dissected. Recomputed over the whole message while
    /// serializing.
    pub checksum: u16,

    /// Raw type specific bytes (identifier/sequence, gateway, MTU,
    /// pointer, RFC 4884 length).
    pub rest: [u8; 4],

    /// RFC 4884 extension structure, serialized after the (zero padded)
    /// original datagram. Only valid for destination unreachable, time
    /// exceeded and parameter problem messages.
    pub extensions: Option<IcmpExtensions>,

    pub inner: Option<Box<Layer>>,
}

impl Icmpv4 {
    /// Length of the fixed header in bytes.
    pub const LEN: usize = 8;

    pub fn echo_request(identifier: u16, sequence: u16) -> Icmpv4 {
        let id = identifier.to_be_bytes();
        let seq = sequence.to_be_bytes();
        Icmpv4 {
            icmp_type: icmpv4_type::ECHO_REQUEST,
            rest: [id[0], id[1], seq[0], seq[1]],
            ..Default::default()
        }
    }

    pub fn echo_reply(identifier: u16, sequence: u16) -> Icmpv4 {
        Icmpv4 {
            icmp_type: icmpv4_type::ECHO_REPLY,
            ..Icmpv4::echo_request(identifier, sequence)
        }
    }

    pub fn time_exceeded(code: u8) -> Icmpv4 {
        Icmpv4 {
            icmp_type: icmpv4_type::TIME_EXCEEDED,
            code,
            ..Default::default()
        }
    }

    pub fn destination_unreachable(code: u8) -> Icmpv4 {
        Icmpv4 {
            icmp_type: icmpv4_type::DEST_UNREACHABLE,
            code,
            ..Default::default()
        }
    }

    /// True if the message type may carry RFC 4884 extensions.
    pub fn supports_extensions(icmp_type: u8) -> bool {
        matches!(
            icmp_type,
            icmpv4_type::DEST_UNREACHABLE
                | icmpv4_type::TIME_EXCEEDED
                | icmpv4_type::PARAM_PROBLEM
        )
    }

    /// Identifier of echo messages.
    pub fn echo_identifier(&self) -> u16 {
        u16::from_be_bytes([self.rest[0], self.rest[1]])
    }

    /// Sequence number of echo messages.
    pub fn echo_sequence(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }

    /// Gateway address of redirect messages.
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.rest)
    }

    /// Next-hop MTU of fragmentation-needed messages.
    pub fn mtu(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }

    /// Pointer of parameter problem messages.
    pub fn pointer(&self) -> u8 {
        self.rest[0]
    }

    pub fn dissect(bytes: &[u8]) -> Result<Icmpv4, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Icmpv4, bytes);
        let icmp_type = cursor.read_u8()?;
        let code = cursor.read_u8()?;
        let checksum = cursor.read_u16()?;
        let rest = cursor.read_array::<4>()?;
        let payload = cursor.rest();

        let (payload, extensions) = if Icmpv4::supports_extensions(icmp_type) {
            split_extensions(payload, usize::from(rest[1]) * 4)
        } else {
            (payload, None)
        };

        let inner = if payload.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(payload.to_vec()))))
        };
        Ok(Icmpv4 {
            icmp_type,
            code,
            checksum,
            rest,
            extensions,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Icmpv4::LEN
    }

    fn padded_payload_len(&self) -> usize {
        let payload_len = self.inner.as_deref().map_or(0, Layer::size);
        if self.extensions.is_some() {
            payload_len.max(IcmpExtensions::MINIMUM_ORIGINAL_DATAGRAM_LEN)
        } else {
            payload_len
        }
    }

    pub fn trailer_size(&self) -> usize {
        match &self.extensions {
            Some(extensions) => {
                let payload_len = self.inner.as_deref().map_or(0, Layer::size);
                (self.padded_payload_len() - payload_len) + extensions.len()
            }
            None => 0,
        }
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut rest = self.rest;
        if let Some(extensions) = &self.extensions {
            let padded = self.padded_payload_len();
            if Icmpv4::supports_extensions(self.icmp_type) {
                if padded / 4 > usize::from(u8::MAX) {
                    return Err(SerializeError::ValueTooBig {
                        layer: LayerKind::Icmpv4,
                        field: "original_datagram_length",
                        actual: padded / 4,
                        max: u8::MAX.into(),
                    });
                }
                rest[1] = (padded / 4) as u8;
            }
            // zero pad the original datagram, then append the structure
            let extensions_len = extensions.len();
            let end = buf.len();
            let trailer = &mut buf[end - self.trailer_size()..];
            let padding_len = trailer.len() - extensions_len;
            trailer[..padding_len].fill(0);
            extensions.write(&mut trailer[padding_len..])?;
        }

        {
            let mut cursor = WriteCursor::new(LayerKind::Icmpv4, &mut buf[..Icmpv4::LEN]);
            cursor.write_u8(self.icmp_type)?;
            cursor.write_u8(self.code)?;
            cursor.write_u16(0)?; // checksum patched below
            cursor.write_slice(&rest)?;
        }

        // checksum covers the whole message including payload & trailer
        let checksum = checksum::Sum16BitWords::new()
            .add_slice(buf)
            .ones_complement()
            .to_be();
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }

    /// An echo reply matches an echo request with the same identifier
    /// and sequence number.
    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        if self.icmp_type != icmpv4_type::ECHO_REQUEST {
            return false;
        }
        match Icmpv4::dissect(bytes) {
            Ok(response) => {
                response.icmp_type == icmpv4_type::ECHO_REPLY
                    && response.echo_identifier() == self.echo_identifier()
                    && response.echo_sequence() == self.echo_sequence()
            }
            Err(_) => false,
        }
    }
}

/// Split an ICMP error payload into the original-datagram part and the
/// RFC 4884 extension structure, following the declared length with a
/// fallback to the 128 byte convention for zero lengths.
fn split_extensions(payload: &[u8], declared_len: usize) -> (&[u8], Option<IcmpExtensions>) {
    let start = if declared_len > 0 {
        declared_len
    } else {
        IcmpExtensions::MINIMUM_ORIGINAL_DATAGRAM_LEN
    };
    if start < payload.len() {
        if let Ok(extensions) = IcmpExtensions::dissect(&payload[start..]) {
            return (&payload[..start], Some(extensions));
        }
    }
    (payload, None)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echo_round_trip() {
        let ping = Icmpv4::echo_request(0x1234, 7) / RawPayload::new(b"abcdefgh".to_vec());
        let bytes = ping.serialize().unwrap();
        assert_eq!(16, bytes.len());

        // checksum over the whole message must verify
        assert_eq!(
            0,
            checksum::Sum16BitWords::new()
                .add_slice(&bytes)
                .ones_complement()
        );

        let dissected = Icmpv4::dissect(&bytes).unwrap();
        assert_eq!(0x1234, dissected.echo_identifier());
        assert_eq!(7, dissected.echo_sequence());
        assert_eq!(bytes, Layer::from(dissected).serialize().unwrap());
    }

    #[test]
    fn extensions_round_trip() {
        let stack = [Mpls {
            label: 10012,
            traffic_class: 0,
            bottom_of_stack: true,
            ttl: 15,
            inner: None,
        }];
        let message = Icmpv4 {
            extensions: Some(IcmpExtensions::with_mpls_stack(&stack).unwrap()),
            ..Icmpv4::time_exceeded(0)
        } / RawPayload::new(vec![0x45; 40]);

        let layer: Layer = message;
        // 8 header + 40 payload + 88 padding + 12 extension structure
        assert_eq!(8 + 128 + 12, layer.size());
        let bytes = layer.serialize().unwrap();

        // the length field counts the padded original datagram in words
        assert_eq!(32, bytes[5]);

        let dissected = Icmpv4::dissect(&bytes).unwrap();
        let extensions = dissected.extensions.as_ref().unwrap();
        let recovered = extensions.objects[0].mpls_stack().unwrap();
        assert_eq!(10012, recovered[0].label);
        assert_eq!(15, recovered[0].ttl);
        assert!(recovered[0].bottom_of_stack);

        // the padded original datagram became the raw payload
        assert_eq!(
            128,
            dissected.inner.as_deref().unwrap().as_raw().unwrap().data.len()
        );
        assert_eq!(bytes, Layer::from(dissected).serialize().unwrap());
    }

    #[test]
    fn zero_length_extension_heuristic() {
        // length byte 0 but payload longer than 128 bytes: extensions
        // are expected right after the 128 byte mark
        let message = Icmpv4 {
            extensions: Some(
                IcmpExtensions::with_mpls_stack(&[Mpls::new(5, 1)]).unwrap(),
            ),
            ..Icmpv4::destination_unreachable(1)
        };
        let bytes = Layer::from(message).serialize().unwrap();

        let mut tampered = bytes.clone();
        tampered[5] = 0; // clear the length byte
        let dissected = Icmpv4::dissect(&tampered).unwrap();
        assert!(dissected.extensions.is_some());
    }

    #[test]
    fn response_matching() {
        let request = Icmpv4::echo_request(7, 1);
        let reply_bytes = Layer::from(Icmpv4::echo_reply(7, 1)).serialize().unwrap();
        assert!(request.matches_response(&reply_bytes));
        let wrong_bytes = Layer::from(Icmpv4::echo_reply(7, 2)).serialize().unwrap();
        assert!(!request.matches_response(&wrong_bytes));
    }
}
