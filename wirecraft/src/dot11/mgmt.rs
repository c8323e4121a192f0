use crate::dot11::{dot11_frame_type, frame_control_byte};
use crate::err::{DissectError, OptionError, SerializeError};
use crate::*;

/// Subtypes of 802.11 management frames.
pub mod dot11_mgmt_subtype {
    pub const ASSOC_REQ: u8 = 0;
    pub const ASSOC_RESP: u8 = 1;
    pub const REASSOC_REQ: u8 = 2;
    pub const REASSOC_RESP: u8 = 3;
    pub const PROBE_REQ: u8 = 4;
    pub const PROBE_RESP: u8 = 5;
    pub const BEACON: u8 = 8;
    pub const ATIM: u8 = 9;
    pub const DISASSOC: u8 = 10;
    pub const AUTH: u8 = 11;
    pub const DEAUTH: u8 = 12;
}

/// Tag numbers of the tagged parameter region.
pub mod dot11_tag {
    pub const SSID: u8 = 0;
    pub const SUPPORTED_RATES: u8 = 1;
    pub const DS_PARAMETER_SET: u8 = 3;
    pub const TIM: u8 = 5;
    pub const COUNTRY: u8 = 7;
    pub const RSN: u8 = 48;
    pub const EXTENDED_SUPPORTED_RATES: u8 = 50;
    pub const VENDOR_SPECIFIC: u8 = 221;
}

/// Fixed parameter block of a management frame, determined by the
/// subtype. All fields are little endian on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Dot11MgmtFixed {
    /// Probe requests & ATIM carry no fixed parameters.
    None,

    /// Beacon & probe response.
    Beacon {
        timestamp: u64,
        interval: u16,
        capabilities: u16,
    },

    AssocReq {
        capabilities: u16,
        listen_interval: u16,
    },

    /// Association & reassociation response.
    AssocResp {
        capabilities: u16,
        status: u16,
        aid: u16,
    },

    ReassocReq {
        capabilities: u16,
        listen_interval: u16,
        current_ap: MacAddr,
    },

    Auth {
        algorithm: u16,
        sequence: u16,
        status: u16,
    },

    /// Deauthentication & disassociation.
    Reason { reason: u16 },
}

impl Dot11MgmtFixed {
    fn len(&self) -> usize {
        match self {
            Dot11MgmtFixed::None => 0,
            Dot11MgmtFixed::Beacon { .. } => 12,
            Dot11MgmtFixed::AssocReq { .. } => 4,
            Dot11MgmtFixed::AssocResp { .. } => 6,
            Dot11MgmtFixed::ReassocReq { .. } => 10,
            Dot11MgmtFixed::Auth { .. } => 6,
            Dot11MgmtFixed::Reason { .. } => 2,
        }
    }
}

/// 802.11 management frame.
///
/// The header is the common 24 byte management header (+6 bytes for the
/// fourth address when both DS flags are set), followed by the
/// subtype's fixed parameter block and the tagged parameter region.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dot11Mgmt {
    /// Protocol version (2 bit), 0 on the wire.
    pub version: u8,

    /// Frame subtype (`dot11_mgmt_subtype` constants).
    pub subtype: u8,

    pub flags: Dot11Flags,

    /// Duration / ID field.
    pub duration: u16,

    /// Receiver address.
    pub addr1: MacAddr,

    /// Transmitter address.
    pub addr2: MacAddr,

    /// BSSID / filtering address.
    pub addr3: MacAddr,

    /// Fragment number (4 bit) and sequence number (12 bit).
    pub sequence_control: u16,

    /// Fourth address, present when both to-DS and from-DS are set.
    pub addr4: Option<MacAddr>,

    pub fixed: Dot11MgmtFixed,

    /// Tagged parameters (1 byte tag, 1 byte length).
    pub options: Vec<TlvOption<u8>>,

    pub inner: Option<Box<Layer>>,
}

impl Dot11Mgmt {
    /// Length of the common management header in bytes.
    pub const BASE_LEN: usize = 24;

    /// Build a beacon frame with zeroed timestamp & default interval.
    pub fn beacon(destination: MacAddr, source: MacAddr) -> Dot11Mgmt {
        Dot11Mgmt {
            version: 0,
            subtype: dot11_mgmt_subtype::BEACON,
            flags: Dot11Flags::default(),
            duration: 0,
            addr1: destination,
            addr2: source,
            addr3: source,
            sequence_control: 0,
            addr4: None,
            fixed: Dot11MgmtFixed::Beacon {
                timestamp: 0,
                interval: 100,
                capabilities: 0,
            },
            options: Vec::new(),
            inner: None,
        }
    }

    /// Build a probe request.
    pub fn probe_request(destination: MacAddr, source: MacAddr) -> Dot11Mgmt {
        Dot11Mgmt {
            subtype: dot11_mgmt_subtype::PROBE_REQ,
            fixed: Dot11MgmtFixed::None,
            ..Dot11Mgmt::beacon(destination, source)
        }
    }

    pub fn dissect(bytes: &[u8]) -> Result<Dot11Mgmt, DissectError> {
        let mut cursor = ReadCursor::new(LayerKind::Dot11Mgmt, bytes);
        let fc0 = cursor.read_u8()?;
        let flags = Dot11Flags::from_byte(cursor.read_u8()?);
        let duration = cursor.read_u16_le()?;
        let addr1 = cursor.read_mac()?;
        let addr2 = cursor.read_mac()?;
        let addr3 = cursor.read_mac()?;
        let sequence_control = cursor.read_u16_le()?;
        let addr4 = if flags.to_ds && flags.from_ds {
            Some(cursor.read_mac()?)
        } else {
            None
        };

        let subtype = fc0 >> 4;
        use self::dot11_mgmt_subtype::*;
        let fixed = match subtype {
            BEACON | PROBE_RESP => Dot11MgmtFixed::Beacon {
                timestamp: cursor.read_u64_le()?,
                interval: cursor.read_u16_le()?,
                capabilities: cursor.read_u16_le()?,
            },
            ASSOC_REQ => Dot11MgmtFixed::AssocReq {
                capabilities: cursor.read_u16_le()?,
                listen_interval: cursor.read_u16_le()?,
            },
            ASSOC_RESP | REASSOC_RESP => Dot11MgmtFixed::AssocResp {
                capabilities: cursor.read_u16_le()?,
                status: cursor.read_u16_le()?,
                aid: cursor.read_u16_le()?,
            },
            REASSOC_REQ => Dot11MgmtFixed::ReassocReq {
                capabilities: cursor.read_u16_le()?,
                listen_interval: cursor.read_u16_le()?,
                current_ap: cursor.read_mac()?,
            },
            AUTH => Dot11MgmtFixed::Auth {
                algorithm: cursor.read_u16_le()?,
                sequence: cursor.read_u16_le()?,
                status: cursor.read_u16_le()?,
            },
            DEAUTH | DISASSOC => Dot11MgmtFixed::Reason {
                reason: cursor.read_u16_le()?,
            },
            _ => Dot11MgmtFixed::None,
        };

        let mut options = Vec::new();
        while !cursor.is_empty() {
            let id = cursor.read_u8()?;
            let len = cursor.read_u8()?;
            options.push(TlvOption::new(id, cursor.read_slice(len.into())?.to_vec()));
        }

        Ok(Dot11Mgmt {
            version: fc0 & 0b11,
            subtype,
            flags,
            duration,
            addr1,
            addr2,
            addr3,
            sequence_control,
            addr4,
            fixed,
            options,
            inner: None,
        })
    }

    fn options_len(&self) -> usize {
        self.options.iter().map(|option| 2 + option.data.len()).sum()
    }

    pub fn header_size(&self) -> usize {
        Dot11Mgmt::BASE_LEN
            + if self.addr4.is_some() { 6 } else { 0 }
            + self.fixed.len()
            + self.options_len()
    }

    /// Find a tagged parameter by its tag number.
    pub fn option(&self, id: u8) -> Result<&TlvOption<u8>, OptionError> {
        crate::options::find_option(&self.options, id, LayerKind::Dot11Mgmt)
    }

    /// The SSID tag decoded as bytes.
    pub fn ssid(&self) -> Result<&[u8], OptionError> {
        Ok(&self.option(dot11_tag::SSID)?.data)
    }

    /// The RSN information element, when present.
    pub fn rsn_information(&self) -> Result<RsnInformation, OptionError> {
        RsnInformation::from_option(self.option(dot11_tag::RSN)?)
    }

    pub(crate) fn write(
        &self,
        buf: &mut [u8],
        _parent: Option<&Layer>,
    ) -> Result<(), SerializeError> {
        let mut cursor = WriteCursor::new(LayerKind::Dot11Mgmt, buf);
        cursor.write_u8(frame_control_byte(
            self.version,
            dot11_frame_type::MANAGEMENT,
            self.subtype,
        ))?;
        cursor.write_u8(self.flags.to_byte())?;
        cursor.write_u16_le(self.duration)?;
        cursor.write_mac(self.addr1)?;
        cursor.write_mac(self.addr2)?;
        cursor.write_mac(self.addr3)?;
        cursor.write_u16_le(self.sequence_control)?;
        if let Some(addr4) = self.addr4 {
            cursor.write_mac(addr4)?;
        }

        match &self.fixed {
            Dot11MgmtFixed::None => {}
            Dot11MgmtFixed::Beacon {
                timestamp,
                interval,
                capabilities,
            } => {
                cursor.write_u64_le(*timestamp)?;
                cursor.write_u16_le(*interval)?;
                cursor.write_u16_le(*capabilities)?;
            }
            Dot11MgmtFixed::AssocReq {
                capabilities,
                listen_interval,
            } => {
                cursor.write_u16_le(*capabilities)?;
                cursor.write_u16_le(*listen_interval)?;
            }
            Dot11MgmtFixed::AssocResp {
                capabilities,
                status,
                aid,
            } => {
                cursor.write_u16_le(*capabilities)?;
                cursor.write_u16_le(*status)?;
                cursor.write_u16_le(*aid)?;
            }
            Dot11MgmtFixed::ReassocReq {
                capabilities,
                listen_interval,
                current_ap,
            } => {
                cursor.write_u16_le(*capabilities)?;
                cursor.write_u16_le(*listen_interval)?;
                cursor.write_mac(*current_ap)?;
            }
            Dot11MgmtFixed::Auth {
                algorithm,
                sequence,
                status,
            } => {
                cursor.write_u16_le(*algorithm)?;
                cursor.write_u16_le(*sequence)?;
                cursor.write_u16_le(*status)?;
            }
            Dot11MgmtFixed::Reason { reason } => {
                cursor.write_u16_le(*reason)?;
            }
        }

        for option in &self.options {
            if option.data.len() > usize::from(u8::MAX) {
                return Err(SerializeError::ValueTooBig {
                    layer: LayerKind::Dot11Mgmt,
                    field: "tagged_parameter_length",
                    actual: option.data.len(),
                    max: u8::MAX.into(),
                });
            }
            cursor.write_u8(option.id)?;
            cursor.write_u8(option.data.len() as u8)?;
            cursor.write_slice(&option.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn beacon_round_trip() {
        let mut beacon = Dot11Mgmt::beacon(
            MacAddr::BROADCAST,
            MacAddr::new([0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb7]),
        );
        beacon.options.push(TlvOption::new(
            dot11_tag::SSID,
            b"test-network".to_vec(),
        ));
        beacon
            .options
            .push(TlvOption::new(dot11_tag::SUPPORTED_RATES, vec![0x82, 0x84]));

        let bytes = Layer::from(beacon.clone()).serialize().unwrap();
        // 24 base + 12 fixed + 14 ssid + 4 rates
        assert_eq!(54, bytes.len());
        // type management, subtype beacon
        assert_eq!(0x80, bytes[0]);

        let dissected = Dot11Mgmt::dissect(&bytes).unwrap();
        assert_eq!(beacon, dissected);
        assert_eq!(b"test-network", dissected.ssid().unwrap());
    }

    #[test]
    fn auth_fixed_parameters() {
        let auth = Dot11Mgmt {
            subtype: dot11_mgmt_subtype::AUTH,
            fixed: Dot11MgmtFixed::Auth {
                algorithm: 0,
                sequence: 1,
                status: 0,
            },
            ..Dot11Mgmt::beacon(MacAddr::BROADCAST, MacAddr::NIL)
        };
        let bytes = Layer::from(auth.clone()).serialize().unwrap();
        assert_eq!(30, bytes.len());
        assert_eq!(auth, Dot11Mgmt::dissect(&bytes).unwrap());
    }

    #[test]
    fn four_address_header() {
        let mut frame = Dot11Mgmt::probe_request(MacAddr::BROADCAST, MacAddr::NIL);
        frame.flags.to_ds = true;
        frame.flags.from_ds = true;
        frame.addr4 = Some(MacAddr::new([9, 8, 7, 6, 5, 4]));
        let bytes = Layer::from(frame.clone()).serialize().unwrap();
        assert_eq!(30, bytes.len());
        assert_eq!(frame, Dot11Mgmt::dissect(&bytes).unwrap());
    }

    #[test]
    fn truncated_tagged_parameter() {
        let mut beacon = Dot11Mgmt::beacon(MacAddr::BROADCAST, MacAddr::NIL);
        beacon
            .options
            .push(TlvOption::new(dot11_tag::SSID, b"abc".to_vec()));
        let mut bytes = Layer::from(beacon).serialize().unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            Dot11Mgmt::dissect(&bytes),
            Err(DissectError::UnexpectedEndOfSlice(_))
        ));
    }
}
