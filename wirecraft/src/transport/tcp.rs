use crate::err::{DissectError, MalformedError, OptionError, SerializeError};
use crate::*;
use arrayvec::ArrayVec;

/// Option kinds of the TCP header.
pub mod tcp_option {
    /// End of option list (single byte).
    pub const EOL: u8 = 0;
    /// No operation (single byte).
    pub const NOP: u8 = 1;
    pub const MSS: u8 = 2;
    pub const WINDOW_SCALE: u8 = 3;
    pub const SACK_PERMITTED: u8 = 4;
    pub const SACK: u8 = 5;
    pub const TIMESTAMP: u8 = 8;
    pub const ALT_CHECKSUM: u8 = 14;
    pub const ALT_CHECKSUM_DATA: u8 = 15;
}

/// TCP flag bits as used by [`Tcp::flag_bits`].
pub mod tcp_flag {
    pub const FIN: u8 = 1 << 0;
    pub const SYN: u8 = 1 << 1;
    pub const RST: u8 = 1 << 2;
    pub const PSH: u8 = 1 << 3;
    pub const ACK: u8 = 1 << 4;
    pub const URG: u8 = 1 << 5;
    pub const ECE: u8 = 1 << 6;
    pub const CWR: u8 = 1 << 7;
}

/// TCP header (RFC 793) with options.
///
/// The data offset is recomputed from the options length and the
/// checksum from the IPv4/IPv6 pseudo header of the enclosing layer
/// while serializing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tcp {
    pub source_port: u16,
    pub destination_port: u16,

    pub sequence: u32,
    pub acknowledgment: u32,

    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,

    pub window: u16,

    /// Checksum as dissected. Recomputed at serialization when an
    /// IPv4/IPv6 parent provides the pseudo header.
    pub checksum: u16,

    pub urgent_pointer: u16,

    /// Raw bytes of the options region (already padded to a multiple of
    /// 4). Use [`Tcp::options`] / [`Tcp::set_options`] for the TLV view.
    pub options: ArrayVec<u8, 40>,

    pub inner: Option<Box<Layer>>,
}

impl Tcp {
    /// Minimum length of the header in bytes.
    pub const MIN_LEN: usize = 20;

    /// Maximum length of the options region in bytes.
    pub const MAX_OPTIONS_LEN: usize = 40;

    pub fn new(source_port: u16, destination_port: u16) -> Tcp {
        Tcp {
            source_port,
            destination_port,
            sequence: 0,
            acknowledgment: 0,
            fin: false,
            syn: false,
            rst: false,
            psh: false,
            ack: false,
            urg: false,
            ece: false,
            cwr: false,
            window: 0x7fff,
            checksum: 0,
            urgent_pointer: 0,
            options: ArrayVec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Tcp, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Tcp, bytes);
        let source_port = cursor.read_u16()?;
        let destination_port = cursor.read_u16()?;
        let sequence = cursor.read_u32()?;
        let acknowledgment = cursor.read_u32()?;
        let offset_flags = cursor.read_u16()?;
        let window = cursor.read_u16()?;
        let checksum = cursor.read_u16()?;
        let urgent_pointer = cursor.read_u16()?;

        let header_len = usize::from(offset_flags >> 12) * 4;
        if header_len < Tcp::MIN_LEN {
            return Err(MalformedError {
                layer: LayerKind::Tcp,
                reason: "data offset smaller than the minimum header",
            }
            .into());
        }
        let options: ArrayVec<u8, 40> = cursor
            .read_slice(header_len - Tcp::MIN_LEN)?
            .try_into()
            .expect("options region is at most 40 bytes");
        let flags = (offset_flags & 0xff) as u8;
        let inner = if cursor.is_empty() {
            None
        } else {
            Some(Box::new(Layer::Raw(RawPayload::new(cursor.rest().to_vec()))))
        };

        Ok(Tcp {
            source_port,
            destination_port,
            sequence,
            acknowledgment,
            fin: 0 != flags & tcp_flag::FIN,
            syn: 0 != flags & tcp_flag::SYN,
            rst: 0 != flags & tcp_flag::RST,
            psh: 0 != flags & tcp_flag::PSH,
            ack: 0 != flags & tcp_flag::ACK,
            urg: 0 != flags & tcp_flag::URG,
            ece: 0 != flags & tcp_flag::ECE,
            cwr: 0 != flags & tcp_flag::CWR,
            window,
            checksum,
            urgent_pointer,
            options,
            inner,
        })
    }

    /// The flag bits as a `tcp_flag` bitfield.
    pub fn flag_bits(&self) -> u8 {
        use self::tcp_flag::*;
        let mut bits = 0;
        if self.fin {
            bits |= FIN;
        }
        if self.syn {
            bits |= SYN;
        }
        if self.rst {
            bits |= RST;
        }
        if self.psh {
            bits |= PSH;
        }
        if self.ack {
            bits |= ACK;
        }
        if self.urg {
            bits |= URG;
        }
        if self.ece {
            bits |= ECE;
        }
        if self.cwr {
            bits |= CWR;
        }
        bits
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        Tcp::MIN_LEN + self.options.len()
    }

    /// The payload bytes carried by this segment (empty when there is no
    /// raw inner layer).
    pub fn payload(&self) -> &[u8] {
        match self.inner.as_deref() {
            Some(Layer::Raw(raw)) => &raw.data,
            _ => &[],
        }
    }

    /// The options region decoded as TLV options (same rules as IPv4:
    /// `EOL` terminates, `NOP` is a single byte, everything else carries
    /// a one byte length including the two header bytes).
    pub fn options(&self) -> Result<Vec<TlvOption<u8>>, OptionError> {
        let mut result = Vec::new();
        let mut rest = &self.options[..];
        while let Some((&id, tail)) = rest.split_first() {
            match id {
                tcp_option::EOL => break,
                tcp_option::NOP => {
                    result.push(TlvOption::new(id, Vec::new()));
                    rest = tail;
                }
                _ => {
                    let (&len, tail) = tail.split_first().ok_or(OptionError::Malformed {
                        layer: LayerKind::Tcp,
                        reason: "option is missing its length byte",
                    })?;
                    let data_len =
                        usize::from(len)
                            .checked_sub(2)
                            .ok_or(OptionError::Malformed {
                                layer: LayerKind::Tcp,
                                reason: "option length smaller than its header",
                            })?;
                    if data_len > tail.len() {
                        return Err(OptionError::Malformed {
                            layer: LayerKind::Tcp,
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
            if option.id != tcp_option::EOL && option.id != tcp_option::NOP {
                encoded.push((option.data.len() + 2) as u8);
                encoded.extend_from_slice(&option.data);
            }
        }
        while encoded.len() % 4 != 0 {
            encoded.push(tcp_option::EOL);
        }
        if encoded.len() > Tcp::MAX_OPTIONS_LEN {
            return Err(SerializeError::ValueTooBig {
                layer: LayerKind::Tcp,
                field: "options",
                actual: encoded.len(),
                max: Tcp::MAX_OPTIONS_LEN,
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
                layer: LayerKind::Tcp,
                id: id.into(),
            })
    }

    /// Maximum segment size announced in the SYN.
    pub fn mss(&self) -> Result<u16, OptionError> {
        self.option(tcp_option::MSS)?.as_u16(LayerKind::Tcp)
    }

    /// True if the SACK-permitted option is present.
    pub fn sack_permitted(&self) -> bool {
        self.option(tcp_option::SACK_PERMITTED).is_ok()
    }

    /// The `(left edge, right edge)` pairs of a SACK option.
    pub fn sack_blocks(&self) -> Result<Vec<(u32, u32)>, OptionError> {
        let values = self
            .option(tcp_option::SACK)?
            .as_u32_list(LayerKind::Tcp)?;
        if values.len() % 2 != 0 {
            return Err(OptionError::Malformed {
                layer: LayerKind::Tcp,
                reason: "sack option with an odd number of edges",
            });
        }
        Ok(values
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect())
    }

    /// The `(value, echo reply)` pair of a timestamp option.
    pub fn timestamp(&self) -> Result<(u32, u32), OptionError> {
        let values = self
            .option(tcp_option::TIMESTAMP)?
            .as_u32_list(LayerKind::Tcp)?;
        match values[..] {
            [value, echo] => Ok((value, echo)),
            _ => Err(OptionError::Malformed {
                layer: LayerKind::Tcp,
                reason: "timestamp option is not 8 bytes",
            }),
        }
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let header_len = self.header_size();
        let offset_flags =
            ((header_len as u16 / 4) << 12) | u16::from(self.flag_bits());

        {
            let mut cursor = WriteCursor::new(LayerKind::Tcp, &mut buf[..header_len]);
            cursor.write_u16(self.source_port)?;
            cursor.write_u16(self.destination_port)?;
            cursor.write_u32(self.sequence)?;
            cursor.write_u32(self.acknowledgment)?;
            cursor.write_u16(offset_flags)?;
            cursor.write_u16(self.window)?;
            cursor.write_u16(0)?; // checksum patched below
            cursor.write_u16(self.urgent_pointer)?;
            cursor.write_slice(&self.options)?;
        }

        let checksum = match parent {
            Some(Layer::Ipv4(ipv4)) => checksum::Sum16BitWords::new()
                .add_4bytes(ipv4.source.octets())
                .add_4bytes(ipv4.destination.octets())
                .add_2bytes([0, ip_number::TCP])
                .add_2bytes((buf.len() as u16).to_be_bytes())
                .add_slice(buf)
                .ones_complement()
                .to_be(),
            Some(Layer::Ipv6(ipv6)) => checksum::Sum16BitWords::new()
                .add_16bytes(ipv6.source.octets())
                .add_16bytes(ipv6.destination.octets())
                .add_4bytes((buf.len() as u32).to_be_bytes())
                .add_2bytes([0, 0])
                .add_2bytes([0, ip_number::TCP])
                .add_slice(buf)
                .ones_complement()
                .to_be(),
            _ => self.checksum,
        };
        buf[16..18].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }

    /// A segment matches as a response when the ports are mirrored.
    pub(crate) fn matches_response(&self, bytes: &[u8]) -> bool {
        let mut cursor = ReadCursor::new(LayerKind::Tcp, bytes);
        match (cursor.read_u16(), cursor.read_u16()) {
            (Ok(source), Ok(destination)) => {
                source == self.destination_port && destination == self.source_port
            }
            _ => false,
        }
    }
}
