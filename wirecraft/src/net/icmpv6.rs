use crate::err::{DissectError, MalformedError, SerializeError};
use crate::*;
use core::net::Ipv6Addr;

/// ICMPv6 message types.
pub mod icmpv6_type {
    pub const DEST_UNREACHABLE: u8 = 1;
    pub const PACKET_TOO_BIG: u8 = 2;
    pub const TIME_EXCEEDED: u8 = 3;
    pub const PARAM_PROBLEM: u8 = 4;
    pub const ECHO_REQUEST: u8 = 128;
    pub const ECHO_REPLY: u8 = 129;
    pub const MLD_QUERY: u8 = 130;
    pub const ROUTER_SOLICIT: u8 = 133;
    pub const ROUTER_ADVERT: u8 = 134;
    pub const NEIGHBOR_SOLICIT: u8 = 135;
    pub const NEIGHBOR_ADVERT: u8 = 136;
    pub const MLDV2_REPORT: u8 = 143;
}

/// Option types of the neighbor discovery option list.
pub mod icmpv6_option {
    pub const SOURCE_LINK_ADDR: u8 = 1;
    pub const TARGET_LINK_ADDR: u8 = 2;
    pub const PREFIX_INFO: u8 = 3;
    pub const REDIRECTED_HEADER: u8 = 4;
    pub const MTU: u8 = 5;
}

/// One multicast address record of an MLDv2 report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MldAddressRecord {
    pub record_type: u8,
    pub multicast_addr: Ipv6Addr,
    pub sources: Vec<Ipv6Addr>,
    /// Auxiliary data (length must be a multiple of 4).
    pub aux_data: Vec<u8>,
}

impl MldAddressRecord {
    fn len(&self) -> usize {
        4 + 16 + self.sources.len() * 16 + self.aux_data.len()
    }
}

/// Type specific part of an ICMPv6 message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Icmpv6Body {
    EchoRequest {
        identifier: u16,
        sequence: u16,
    },
    EchoReply {
        identifier: u16,
        sequence: u16,
    },
    DestUnreachable,
    PacketTooBig {
        mtu: u32,
    },
    TimeExceeded,
    ParamProblem {
        pointer: u32,
    },
    RouterSolicit {
        options: Vec<TlvOption<u8>>,
    },
    RouterAdvert {
        current_hop_limit: u8,
        flags: u8,
        router_lifetime: u16,
        reachable_time: u32,
        retrans_timer: u32,
        options: Vec<TlvOption<u8>>,
    },
    NeighborSolicit {
        target: Ipv6Addr,
        options: Vec<TlvOption<u8>>,
    },
    NeighborAdvert {
        router: bool,
        solicited: bool,
        override_flag: bool,
        target: Ipv6Addr,
        options: Vec<TlvOption<u8>>,
    },
    /// Multicast listener query (MLDv2 layout).
    MldQuery {
        max_response_code: u16,
        multicast_addr: Ipv6Addr,
        suppress: bool,
        robustness: u8,
        interval_code: u8,
        sources: Vec<Ipv6Addr>,
    },
    Mldv2Report {
        records: Vec<MldAddressRecord>,
    },
    /// Unrecognized type: the 4 bytes after the checksum, kept raw.
    Raw {
        rest: [u8; 4],
    },
}

impl Icmpv6Body {
    /// The neighbor discovery option list of bodies that carry one.
    pub fn options(&self) -> Option<&[TlvOption<u8>]> {
        match self {
            Icmpv6Body::RouterSolicit { options }
            | Icmpv6Body::RouterAdvert { options, .. }
            | Icmpv6Body::NeighborSolicit { options, .. }
            | Icmpv6Body::NeighborAdvert { options, .. } => Some(options),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        let nd_options_len = |options: &[TlvOption<u8>]| -> usize {
            options.iter().map(|option| 2 + option.data.len()).sum()
        };
        match self {
            Icmpv6Body::EchoRequest { .. }
            | Icmpv6Body::EchoReply { .. }
            | Icmpv6Body::DestUnreachable
            | Icmpv6Body::PacketTooBig { .. }
            | Icmpv6Body::TimeExceeded
            | Icmpv6Body::ParamProblem { .. }
            | Icmpv6Body::Raw { .. } => 4,
            Icmpv6Body::RouterSolicit { options } => 4 + nd_options_len(options),
            Icmpv6Body::RouterAdvert { options, .. } => 12 + nd_options_len(options),
            Icmpv6Body::NeighborSolicit { options, .. }
            | Icmpv6Body::NeighborAdvert { options, .. } => 20 + nd_options_len(options),
            Icmpv6Body::MldQuery { sources, .. } => 24 + sources.len() * 16,
            Icmpv6Body::Mldv2Report { records } => {
                4 + records.iter().map(MldAddressRecord::len).sum::<usize>()
            }
        }
    }
}

/// ICMPv6 message (RFC 4443 and friends).
///
/// The checksum uses the IPv6 pseudo header of the enclosing layer and
/// is recomputed while serializing. Neighbor discovery messages carry
/// typed option lists whose length field counts 8 byte units including
/// the 2 byte option header. Time exceeded messages may carry an
/// RFC 4884 extension structure (length in 8 byte units).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Icmpv6 {
    pub icmp_type: u8,
    pub code: u8,

    /// Checksum as dissected. Recomputed at serialization when an IPv6
    /// parent provides the pseudo header.
    pub checksum: u16,

    pub body: Icmpv6Body,

    /// RFC 4884 extensions (time exceeded messages).
    pub extensions: Option<IcmpExtensions>,

    pub inner: Option<Box<Layer>>,
}

impl Icmpv6 {
    /// Length of the fixed header (type, code, checksum) in bytes.
    pub const MIN_LEN: usize = 4;

    pub fn echo_request(identifier: u16, sequence: u16) -> Icmpv6 {
        Icmpv6 {
            icmp_type: icmpv6_type::ECHO_REQUEST,
            code: 0,
            checksum: 0,
            body: Icmpv6Body::EchoRequest {
                identifier,
                sequence,
            },
            extensions: None,
            inner: None,
        }
    }

    pub fn echo_reply(identifier: u16, sequence: u16) -> Icmpv6 {
        Icmpv6 {
            icmp_type: icmpv6_type::ECHO_REPLY,
            body: Icmpv6Body::EchoReply {
                identifier,
                sequence,
            },
            ..Icmpv6::echo_request(identifier, sequence)
        }
    }

    pub fn time_exceeded(code: u8) -> Icmpv6 {
        Icmpv6 {
            icmp_type: icmpv6_type::TIME_EXCEEDED,
            code,
            checksum: 0,
            body: Icmpv6Body::TimeExceeded,
            extensions: None,
            inner: None,
        }
    }

    pub fn neighbor_solicit(target: Ipv6Addr) -> Icmpv6 {
        Icmpv6 {
            icmp_type: icmpv6_type::NEIGHBOR_SOLICIT,
            code: 0,
            checksum: 0,
            body: Icmpv6Body::NeighborSolicit {
                target,
                options: Vec::new(),
            },
            extensions: None,
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Icmpv6, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Icmpv6, bytes);
        let icmp_type = cursor.read_u8()?;
        let code = cursor.read_u8()?;
        let checksum = cursor.read_u16()?;

        use self::icmpv6_type::*;
        let mut extensions = None;
        let mut inner_payload: &[u8] = &[];
        let body = match icmp_type {
            ECHO_REQUEST => {
                let identifier = cursor.read_u16()?;
                let sequence = cursor.read_u16()?;
                inner_payload = cursor.rest();
                Icmpv6Body::EchoRequest {
                    identifier,
                    sequence,
                }
            }
            ECHO_REPLY => {
                let identifier = cursor.read_u16()?;
                let sequence = cursor.read_u16()?;
                inner_payload = cursor.rest();
                Icmpv6Body::EchoReply {
                    identifier,
                    sequence,
                }
            }
            DEST_UNREACHABLE => {
                cursor.skip(4)?;
                inner_payload = cursor.rest();
                Icmpv6Body::DestUnreachable
            }
            PACKET_TOO_BIG => {
                let mtu = cursor.read_u32()?;
                inner_payload = cursor.rest();
                Icmpv6Body::PacketTooBig { mtu }
            }
            TIME_EXCEEDED => {
                let length = cursor.read_u8()?;
                cursor.skip(3)?;
                let payload = cursor.rest();
                let (payload, found) =
                    split_extensions_64bit(payload, usize::from(length) * 8);
                inner_payload = payload;
                extensions = found;
                Icmpv6Body::TimeExceeded
            }
            PARAM_PROBLEM => {
                let pointer = cursor.read_u32()?;
                inner_payload = cursor.rest();
                Icmpv6Body::ParamProblem { pointer }
            }
            ROUTER_SOLICIT => {
                cursor.skip(4)?;
                Icmpv6Body::RouterSolicit {
                    options: read_nd_options(&mut cursor)?,
                }
            }
            ROUTER_ADVERT => {
                let current_hop_limit = cursor.read_u8()?;
                let flags = cursor.read_u8()?;
                let router_lifetime = cursor.read_u16()?;
                let reachable_time = cursor.read_u32()?;
                let retrans_timer = cursor.read_u32()?;
                Icmpv6Body::RouterAdvert {
                    current_hop_limit,
                    flags,
                    router_lifetime,
                    reachable_time,
                    retrans_timer,
                    options: read_nd_options(&mut cursor)?,
                }
            }
            NEIGHBOR_SOLICIT => {
                cursor.skip(4)?;
                let target = cursor.read_ipv6_addr()?;
                Icmpv6Body::NeighborSolicit {
                    target,
                    options: read_nd_options(&mut cursor)?,
                }
            }
            NEIGHBOR_ADVERT => {
                let flags = cursor.read_u32()?;
                let target = cursor.read_ipv6_addr()?;
                Icmpv6Body::NeighborAdvert {
                    router: 0 != flags & 0x8000_0000,
                    solicited: 0 != flags & 0x4000_0000,
                    override_flag: 0 != flags & 0x2000_0000,
                    target,
                    options: read_nd_options(&mut cursor)?,
                }
            }
            MLD_QUERY if cursor.remaining() >= 24 => {
                let max_response_code = cursor.read_u16()?;
                cursor.skip(2)?;
                let multicast_addr = cursor.read_ipv6_addr()?;
                let sqrv = cursor.read_u8()?;
                let interval_code = cursor.read_u8()?;
                let source_count = cursor.read_u16()?;
                let mut sources = Vec::with_capacity(source_count.into());
                for _ in 0..source_count {
                    sources.push(cursor.read_ipv6_addr()?);
                }
                Icmpv6Body::MldQuery {
                    max_response_code,
                    multicast_addr,
                    suppress: 0 != sqrv & 0b1000,
                    robustness: sqrv & 0b111,
                    interval_code,
                    sources,
                }
            }
            MLDV2_REPORT => {
                cursor.skip(2)?;
                let record_count = cursor.read_u16()?;
                let mut records = Vec::with_capacity(record_count.into());
                for _ in 0..record_count {
                    let record_type = cursor.read_u8()?;
                    let aux_len = cursor.read_u8()?;
                    let source_count = cursor.read_u16()?;
                    let multicast_addr = cursor.read_ipv6_addr()?;
                    let mut sources = Vec::with_capacity(source_count.into());
                    for _ in 0..source_count {
                        sources.push(cursor.read_ipv6_addr()?);
                    }
                    let aux_data = cursor.read_slice(usize::from(aux_len) * 4)?.to_vec();
                    records.push(MldAddressRecord {
                        record_type,
                        multicast_addr,
                        sources,
                        aux_data,
                    });
                }
                Icmpv6Body::Mldv2Report { records }
            }
            _ => {
                let rest = cursor.read_array::<4>()?;
                inner_payload = cursor.rest();
                Icmpv6Body::Raw { rest }
            }
        };

        let inner = if inner_payload.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(inner_payload.to_vec()))))
        };
        Ok(Icmpv6 {
            icmp_type,
            code,
            checksum,
            body,
            extensions,
            inner,
        })
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Icmpv6::MIN_LEN + self.body.len()
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
        parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        // extension trailer first so the checksum can cover it
        if let Some(extensions) = &self.extensions {
            let extensions_len = extensions.len();
            let end = buf.len();
            let trailer = &mut buf[end - self.trailer_size()..];
            let padding_len = trailer.len() - extensions_len;
            trailer[..padding_len].fill(0);
            extensions.write(&mut trailer[padding_len..])?;
        }

        let header_size = self.header_size();
        {
            let mut cursor = WriteCursor::new(LayerKind::Icmpv6, &mut buf[..header_size]);
            cursor.write_u8(self.icmp_type)?;
            cursor.write_u8(self.code)?;
            cursor.write_u16(0)?; // checksum patched below
            self.write_body(&mut cursor)?;
        }

        let checksum = match parent {
            Some(Layer::Ipv6(ipv6)) => {
                let sum = checksum::Sum16BitWords::new()
                    .add_16bytes(ipv6.source.octets())
                    .add_16bytes(ipv6.destination.octets())
                    .add_4bytes((buf.len() as u32).to_be_bytes())
                    .add_2bytes([0, 0])
                    .add_2bytes([0, ip_number::ICMPV6])
                    .add_slice(buf);
                sum.ones_complement().to_be()
            }
            _ => self.checksum,
        };
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }

    fn write_body(&self, cursor: &mut WriteCursor<'_>) -> Result<(), SerializeError> {
        let write_nd_options =
            |cursor: &mut WriteCursor<'_>, options: &[TlvOption<u8>]| -> Result<(), SerializeError> {
                for option in options {
                    let total = 2 + option.data.len();
                    if total % 8 != 0 || total / 8 > usize::from(u8::MAX) {
                        return Err(SerializeError::ValueTooBig {
                            layer: LayerKind::Icmpv6,
                            field: "nd_option_length",
                            actual: total,
                            max: 8 * usize::from(u8::MAX),
                        });
                    }
                    cursor.write_u8(option.id)?;
                    cursor.write_u8((total / 8) as u8)?;
                    cursor.write_slice(&option.data)?;
                }
                Ok(())
            };

        match &self.body {
            Icmpv6Body::EchoRequest {
                identifier,
                sequence,
            }
            | Icmpv6Body::EchoReply {
                identifier,
                sequence,
            } => {
                cursor.write_u16(*identifier)?;
                cursor.write_u16(*sequence)
            }
            Icmpv6Body::DestUnreachable => cursor.write_u32(0),
            Icmpv6Body::PacketTooBig { mtu } => cursor.write_u32(*mtu),
            Icmpv6Body::TimeExceeded => {
                // RFC 4884 length counts the padded original datagram in
                // 8 byte units
                let length = if self.extensions.is_some() {
                    (self.padded_payload_len() / 8) as u8
                } else {
                    0
                };
                cursor.write_u8(length)?;
                cursor.write_u8(0)?;
                cursor.write_u16(0)
            }
            Icmpv6Body::ParamProblem { pointer } => cursor.write_u32(*pointer),
            Icmpv6Body::RouterSolicit { options } => {
                cursor.write_u32(0)?;
                write_nd_options(cursor, options)
            }
            Icmpv6Body::RouterAdvert {
                current_hop_limit,
                flags,
                router_lifetime,
                reachable_time,
                retrans_timer,
                options,
            } => {
                cursor.write_u8(*current_hop_limit)?;
                cursor.write_u8(*flags)?;
                cursor.write_u16(*router_lifetime)?;
                cursor.write_u32(*reachable_time)?;
                cursor.write_u32(*retrans_timer)?;
                write_nd_options(cursor, options)
            }
            Icmpv6Body::NeighborSolicit { target, options } => {
                cursor.write_u32(0)?;
                cursor.write_ipv6_addr(*target)?;
                write_nd_options(cursor, options)
            }
            Icmpv6Body::NeighborAdvert {
                router,
                solicited,
                override_flag,
                target,
                options,
            } => {
                let flags = if *router { 0x8000_0000u32 } else { 0 }
                    | if *solicited { 0x4000_0000 } else { 0 }
                    | if *override_flag { 0x2000_0000 } else { 0 };
                cursor.write_u32(flags)?;
                cursor.write_ipv6_addr(*target)?;
                write_nd_options(cursor, options)
            }
            Icmpv6Body::MldQuery {
                max_response_code,
                multicast_addr,
                suppress,
                robustness,
                interval_code,
                sources,
            } => {
                cursor.write_u16(*max_response_code)?;
                cursor.write_u16(0)?;
                cursor.write_ipv6_addr(*multicast_addr)?;
                cursor.write_u8(if *suppress { 0b1000 } else { 0 } | (robustness & 0b111))?;
                cursor.write_u8(*interval_code)?;
                cursor.write_u16(sources.len() as u16)?;
                for source in sources {
                    cursor.write_ipv6_addr(*source)?;
                }
                Ok(())
            }
            Icmpv6Body::Mldv2Report { records } => {
                cursor.write_u16(0)?;
                cursor.write_u16(records.len() as u16)?;
                for record in records {
                    if record.aux_data.len() % 4 != 0 {
                        return Err(SerializeError::ValueTooBig {
                            layer: LayerKind::Icmpv6,
                            field: "aux_data_length",
                            actual: record.aux_data.len(),
                            max: record.aux_data.len() / 4 * 4,
                        });
                    }
                    cursor.write_u8(record.record_type)?;
                    cursor.write_u8((record.aux_data.len() / 4) as u8)?;
                    cursor.write_u16(record.sources.len() as u16)?;
                    cursor.write_ipv6_addr(record.multicast_addr)?;
                    for source in &record.sources {
                        cursor.write_ipv6_addr(*source)?;
                    }
                    cursor.write_slice(&record.aux_data)?;
                }
                Ok(())
            }
            Icmpv6Body::Raw { rest } => cursor.write_slice(rest),
        }
    }
}

/// Read neighbor discovery options until the cursor is exhausted. The
/// length field counts 8 byte units including the 2 byte header.
fn read_nd_options(cursor: &mut ReadCursor<'_>) -> Result<Vec<TlvOption<u8>>, DissectError> {
    let mut options = Vec::new();
    while !cursor.is_empty() {
        let id = cursor.read_u8()?;
        let length = cursor.read_u8()?;
        if length == 0 {
            return Err(MalformedError {
                layer: LayerKind::Icmpv6,
                reason: "nd option with zero length",
            }
            .into());
        }
        let data = cursor.read_slice(usize::from(length) * 8 - 2)?.to_vec();
        options.push(TlvOption::new(id, data));
    }
    Ok(options)
}

/// Split an ICMPv6 error payload into original datagram & RFC 4884
/// extensions (length counted in 8 byte units, 128 byte fallback).
fn split_extensions_64bit(payload: &[u8], declared_len: usize) -> (&[u8], Option<IcmpExtensions>) {
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

    fn addr(last: u8) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets[0] = 0xfe;
        octets[1] = 0x80;
        octets[15] = last;
        Ipv6Addr::from(octets)
    }

    #[test]
    fn echo_checksum_uses_pseudo_header() {
        let packet = Ipv6::new(addr(1), addr(2), 64)
            / Icmpv6::echo_request(1, 2)
            / RawPayload::new(vec![0x61, 0x62]);
        let bytes = packet.serialize().unwrap();
        let icmp = &bytes[40..];

        // verify against the pseudo header sum
        let verify = checksum::Sum16BitWords::new()
            .add_16bytes(addr(1).octets())
            .add_16bytes(addr(2).octets())
            .add_4bytes((icmp.len() as u32).to_be_bytes())
            .add_2bytes([0, ip_number::ICMPV6])
            .add_slice(icmp)
            .ones_complement();
        assert_eq!(0, verify);

        let dissected = Ipv6::dissect(&bytes).unwrap();
        let icmp_layer = dissected.inner.as_deref().unwrap();
        assert_eq!(LayerKind::Icmpv6, icmp_layer.kind());
    }

    #[test]
    fn neighbor_solicit_options_round_trip() {
        let mut message = Icmpv6::neighbor_solicit(addr(9));
        if let Icmpv6Body::NeighborSolicit { options, .. } = &mut message.body {
            options.push(TlvOption::new(
                icmpv6_option::SOURCE_LINK_ADDR,
                vec![1, 2, 3, 4, 5, 6],
            ));
        }
        let bytes = Layer::from(message.clone()).serialize().unwrap();
        assert_eq!(4 + 20 + 8, bytes.len());

        let dissected = Icmpv6::dissect(&bytes).unwrap();
        match &dissected.body {
            Icmpv6Body::NeighborSolicit { target, options } => {
                assert_eq!(addr(9), *target);
                assert_eq!(1, options.len());
                assert_eq!(vec![1, 2, 3, 4, 5, 6], options[0].data);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn mldv2_report_round_trip() {
        let message = Icmpv6 {
            icmp_type: icmpv6_type::MLDV2_REPORT,
            code: 0,
            checksum: 0,
            body: Icmpv6Body::Mldv2Report {
                records: vec![MldAddressRecord {
                    record_type: 4, // change to exclude
                    multicast_addr: addr(0x10),
                    sources: vec![addr(1), addr(2)],
                    aux_data: Vec::new(),
                }],
            },
            extensions: None,
            inner: None,
        };
        let bytes = Layer::from(message.clone()).serialize().unwrap();
        assert_eq!(4 + 4 + 4 + 16 + 32, bytes.len());
        assert_eq!(message, Icmpv6::dissect(&bytes).unwrap());
    }

    #[test]
    fn mld_query_sources_round_trip() {
        let message = Icmpv6 {
            icmp_type: icmpv6_type::MLD_QUERY,
            code: 0,
            checksum: 0,
            body: Icmpv6Body::MldQuery {
                max_response_code: 1000,
                multicast_addr: addr(0x20),
                suppress: true,
                robustness: 2,
                interval_code: 125,
                sources: vec![addr(7)],
            },
            extensions: None,
            inner: None,
        };
        let bytes = Layer::from(message.clone()).serialize().unwrap();
        assert_eq!(4 + 24 + 16, bytes.len());
        assert_eq!(message, Icmpv6::dissect(&bytes).unwrap());
    }

    #[test]
    fn time_exceeded_extensions_round_trip() {
        let message = Icmpv6 {
            extensions: Some(
                IcmpExtensions::with_mpls_stack(&[Mpls::new(42, 3)]).unwrap(),
            ),
            ..Icmpv6::time_exceeded(0)
        } / RawPayload::new(vec![0x60; 48]);
        let layer: Layer = message;
        // 8 header + 128 padded datagram + 12 extensions
        assert_eq!(8 + 128 + 12, layer.size());
        let bytes = layer.serialize().unwrap();
        // length field counts 8 byte units
        assert_eq!(16, bytes[4]);

        let dissected = Icmpv6::dissect(&bytes).unwrap();
        let stack = dissected.extensions.as_ref().unwrap().objects[0]
            .mpls_stack()
            .unwrap();
        assert_eq!(42, stack[0].label);
    }
}
