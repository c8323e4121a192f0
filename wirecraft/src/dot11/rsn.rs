use crate::err::OptionError;
use crate::{LayerKind, ReadCursor, TlvOption};

/// A cipher or AKM suite selector: OUI plus suite type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SuiteSelector {
    pub oui: [u8; 3],
    pub suite_type: u8,
}

impl SuiteSelector {
    /// The IEEE 802.11 OUI used by the standard suites.
    pub const IEEE_OUI: [u8; 3] = [0x00, 0x0f, 0xac];

    /// CCMP-128 pairwise/group cipher.
    pub const CCMP: SuiteSelector = SuiteSelector {
        oui: SuiteSelector::IEEE_OUI,
        suite_type: 4,
    };

    /// TKIP cipher.
    pub const TKIP: SuiteSelector = SuiteSelector {
        oui: SuiteSelector::IEEE_OUI,
        suite_type: 2,
    };

    /// PSK authentication & key management.
    pub const PSK: SuiteSelector = SuiteSelector {
        oui: SuiteSelector::IEEE_OUI,
        suite_type: 2,
    };

    fn from_bytes(bytes: [u8; 4]) -> SuiteSelector {
        SuiteSelector {
            oui: [bytes[0], bytes[1], bytes[2]],
            suite_type: bytes[3],
        }
    }

    fn to_bytes(self) -> [u8; 4] {
        [self.oui[0], self.oui[1], self.oui[2], self.suite_type]
    }
}

/// RSN information element as carried in the tagged parameters of
/// beacons, probe responses and association requests.
///
/// Layout: version, group cipher suite, a counted list of pairwise
/// cipher suites, a counted list of AKM suites and the RSN
/// capabilities (all counts & the version little endian).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RsnInformation {
    pub version: u16,
    pub group_cipher: SuiteSelector,
    pub pairwise_ciphers: Vec<SuiteSelector>,
    pub akm_suites: Vec<SuiteSelector>,
    pub capabilities: u16,
}

impl RsnInformation {
    /// A WPA2-PSK (CCMP) information element.
    pub fn wpa2_psk() -> RsnInformation {
        RsnInformation {
            version: 1,
            group_cipher: SuiteSelector::CCMP,
            pairwise_ciphers: vec![SuiteSelector::CCMP],
            akm_suites: vec![SuiteSelector::PSK],
            capabilities: 0,
        }
    }

    /// Decode the element from an RSN tagged parameter.
    pub fn from_option(option: &TlvOption<u8>) -> Result<RsnInformation, OptionError> {
        fn truncated(_: crate::err::UnexpectedEndOfSliceError) -> OptionError {
            OptionError::Malformed {
                layer: LayerKind::Dot11Mgmt,
                reason: "rsn element shorter than its structure",
            }
        }

        let mut cursor = ReadCursor::new(LayerKind::Dot11Mgmt, &option.data);
        let version = cursor.read_u16_le().map_err(truncated)?;
        let group_cipher =
            SuiteSelector::from_bytes(cursor.read_array::<4>().map_err(truncated)?);
        let pairwise_count = cursor.read_u16_le().map_err(truncated)?;
        let mut pairwise_ciphers = Vec::with_capacity(pairwise_count.into());
        for _ in 0..pairwise_count {
            pairwise_ciphers.push(SuiteSelector::from_bytes(
                cursor.read_array::<4>().map_err(truncated)?,
            ));
        }
        let akm_count = cursor.read_u16_le().map_err(truncated)?;
        let mut akm_suites = Vec::with_capacity(akm_count.into());
        for _ in 0..akm_count {
            akm_suites.push(SuiteSelector::from_bytes(
                cursor.read_array::<4>().map_err(truncated)?,
            ));
        }
        let capabilities = cursor.read_u16_le().map_err(truncated)?;

        Ok(RsnInformation {
            version,
            group_cipher,
            pairwise_ciphers,
            akm_suites,
            capabilities,
        })
    }

    /// Encode the element as an RSN tagged parameter.
    pub fn to_option(&self) -> TlvOption<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.group_cipher.to_bytes());
        data.extend_from_slice(&(self.pairwise_ciphers.len() as u16).to_le_bytes());
        for suite in &self.pairwise_ciphers {
            data.extend_from_slice(&suite.to_bytes());
        }
        data.extend_from_slice(&(self.akm_suites.len() as u16).to_le_bytes());
        for suite in &self.akm_suites {
            data.extend_from_slice(&suite.to_bytes());
        }
        data.extend_from_slice(&self.capabilities.to_le_bytes());
        TlvOption::new(crate::dot11_tag::RSN, data)
    }
}
