use crate::err::{DissectError, MalformedError, OptionError, SerializeError};
use crate::*;
use core::net::Ipv4Addr;

/// DHCP option codes (subset of the IANA registry).
pub mod dhcp_option {
    /// Padding (single byte).
    pub const PAD: u8 = 0;
    pub const SUBNET_MASK: u8 = 1;
    pub const ROUTERS: u8 = 3;
    pub const DOMAIN_NAME_SERVERS: u8 = 6;
    pub const HOSTNAME: u8 = 12;
    pub const REQUESTED_IP: u8 = 50;
    pub const LEASE_TIME: u8 = 51;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_ID: u8 = 54;
    pub const PARAMETER_REQUEST_LIST: u8 = 55;
    /// End of options (single byte).
    pub const END: u8 = 255;
}

/// DHCP message types (value of the `MESSAGE_TYPE` option).
pub mod dhcp_message_type {
    pub const DISCOVER: u8 = 1;
    pub const OFFER: u8 = 2;
    pub const REQUEST: u8 = 3;
    pub const DECLINE: u8 = 4;
    pub const ACK: u8 = 5;
    pub const NAK: u8 = 6;
    pub const RELEASE: u8 = 7;
    pub const INFORM: u8 = 8;
}

/// DHCPv4 message (RFC 2131): the fixed BOOTP block, the magic cookie
/// and a TLV option list terminated by the `END` option.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dhcp {
    /// Message op code (1 request, 2 reply).
    pub op: u8,

    /// Hardware type (1 = Ethernet).
    pub htype: u8,

    /// Hardware address length.
    pub hlen: u8,

    pub hops: u8,

    /// Transaction id.
    pub xid: u32,

    pub secs: u16,
    pub flags: u16,

    /// Client address (if already bound).
    pub ciaddr: Ipv4Addr,

    /// Address being offered / assigned.
    pub yiaddr: Ipv4Addr,

    /// Next server address.
    pub siaddr: Ipv4Addr,

    /// Relay agent address.
    pub giaddr: Ipv4Addr,

    /// Client hardware address, zero padded.
    pub chaddr: [u8; 16],

    /// Server host name, zero padded.
    pub sname: [u8; 64],

    /// Boot file name, zero padded.
    pub file: [u8; 128],

    pub options: Vec<TlvOption<u8>>,

    /// Bytes after the `END` option, kept for bit-exact round trips.
    pub padding: Vec<u8>,

    pub inner: Option<Box<Layer>>,
}

impl Dhcp {
    /// Length of the fixed block plus the magic cookie in bytes.
    pub const MIN_LEN: usize = 236 + 4;

    /// The magic cookie announcing the options region.
    pub const MAGIC_COOKIE: u32 = 0x6382_5363;

    pub fn new(xid: u32, chaddr: MacAddr) -> Dhcp {
        let mut hw = [0u8; 16];
        hw[..6].copy_from_slice(&chaddr.octets());
        Dhcp {
            op: 1,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: hw,
            sname: [0; 64],
            file: [0; 128],
            options: Vec::new(),
            padding: Vec::new(),
            inner: None,
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dhcp, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dhcp, bytes);
        let op = cursor.read_u8()?;
        let htype = cursor.read_u8()?;
        let hlen = cursor.read_u8()?;
        let hops = cursor.read_u8()?;
        let xid = cursor.read_u32()?;
        let secs = cursor.read_u16()?;
        let flags = cursor.read_u16()?;
        let ciaddr = cursor.read_ipv4_addr()?;
        let yiaddr = cursor.read_ipv4_addr()?;
        let siaddr = cursor.read_ipv4_addr()?;
        let giaddr = cursor.read_ipv4_addr()?;
        let chaddr = cursor.read_array::<16>()?;
        let sname = cursor.read_array::<64>()?;
        let file = cursor.read_array::<128>()?;
        if cursor.read_u32()? != Dhcp::MAGIC_COOKIE {
            return Err(MalformedError {
                layer: LayerKind::Dhcp,
                reason: "missing magic cookie",
            }
            .into());
        }

        let mut options = Vec::new();
        loop {
            if cursor.is_empty() {
                break;
            }
            let id = cursor.read_u8()?;
            match id {
                dhcp_option::PAD => options.push(TlvOption::new(id, Vec::new())),
                dhcp_option::END => break,
                _ => {
                    let len = cursor.read_u8()?;
                    options.push(TlvOption::new(id, cursor.read_slice(len.into())?.to_vec()));
                }
            }
        }
        let padding = cursor.rest().to_vec();

        Ok(Dhcp {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
            padding,
            inner: None,
        })
    }

    fn options_len(&self) -> usize {
        self.options
            .iter()
            .map(|option| {
                if option.id == dhcp_option::PAD {
                    1
                } else {
                    2 + option.data.len()
                }
            })
            .sum()
    }

    pub fn header_size(&self) -> usize {
        // fixed block + cookie + options + END + padding
        Dhcp::MIN_LEN + self.options_len() + 1 + self.padding.len()
    }

    /// Find an option by its code.
    pub fn option(&self, id: u8) -> Result<&TlvOption<u8>, OptionError> {
        crate::options::find_option(&self.options, id, LayerKind::Dhcp)
    }

    /// The DHCP message type option value.
    pub fn message_type(&self) -> Result<u8, OptionError> {
        self.option(dhcp_option::MESSAGE_TYPE)?
            .as_u8(LayerKind::Dhcp)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Dhcp, buf);
        cursor.write_u8(self.op)?;
        cursor.write_u8(self.htype)?;
        cursor.write_u8(self.hlen)?;
        cursor.write_u8(self.hops)?;
        cursor.write_u32(self.xid)?;
        cursor.write_u16(self.secs)?;
        cursor.write_u16(self.flags)?;
        cursor.write_ipv4_addr(self.ciaddr)?;
        cursor.write_ipv4_addr(self.yiaddr)?;
        cursor.write_ipv4_addr(self.siaddr)?;
        cursor.write_ipv4_addr(self.giaddr)?;
        cursor.write_slice(&self.chaddr)?;
        cursor.write_slice(&self.sname)?;
        cursor.write_slice(&self.file)?;
        cursor.write_u32(Dhcp::MAGIC_COOKIE)?;
        for option in &self.options {
            cursor.write_u8(option.id)?;
            if option.id != dhcp_option::PAD {
                if option.data.len() > usize::from(u8::MAX) {
                    return Err(SerializeError::ValueTooBig {
                        layer: LayerKind::Dhcp,
                        field: "option_length",
                        actual: option.data.len(),
                        max: u8::MAX.into(),
                    });
                }
                cursor.write_u8(option.data.len() as u8)?;
                cursor.write_slice(&option.data)?;
            }
        }
        cursor.write_u8(dhcp_option::END)?;
        cursor.write_slice(&self.padding)
    }
}
