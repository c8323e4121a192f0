use crate::err::DissectError;
use crate::*;

/// The outermost framing of a captured packet (libpcap DLT values).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkType {
    /// BSD loopback encapsulation (DLT_NULL).
    Null,
    /// Ethernet II (DLT_EN10MB).
    Ethernet,
    /// 802.11 without radio information (DLT_IEEE802_11).
    Ieee802_11,
    /// Linux cooked capture (DLT_LINUX_SLL).
    LinuxSll,
    /// 802.11 preceded by a RadioTap header (DLT_IEEE802_11_RADIO).
    Ieee802_11RadioTap,
    /// Per packet information encapsulation (DLT_PPI).
    Ppi,
}

impl LinkType {
    /// The libpcap DLT value of this link type.
    pub fn dlt_value(self) -> u32 {
        match self {
            LinkType::Null => dlt::NULL,
            LinkType::Ethernet => dlt::EN10MB,
            LinkType::Ieee802_11 => dlt::IEEE802_11,
            LinkType::LinuxSll => dlt::LINUX_SLL,
            LinkType::Ieee802_11RadioTap => dlt::IEEE802_11_RADIO,
            LinkType::Ppi => dlt::PPI,
        }
    }

    /// Look up the link type for a libpcap DLT value.
    pub fn from_dlt_value(value: u32) -> Option<LinkType> {
        match value {
            dlt::NULL => Some(LinkType::Null),
            dlt::EN10MB => Some(LinkType::Ethernet),
            dlt::IEEE802_11 => Some(LinkType::Ieee802_11),
            dlt::LINUX_SLL => Some(LinkType::LinuxSll),
            dlt::IEEE802_11_RADIO => Some(LinkType::Ieee802_11RadioTap),
            dlt::PPI => Some(LinkType::Ppi),
            _ => None,
        }
    }
}

/// Dissect a captured frame into a layer chain, starting at the given
/// link layer framing.
///
/// ```
/// use wirecraft::{dissect, LinkType, LayerKind};
///
/// # let frame = {
/// #     use wirecraft::*;
/// #     (Ethernet2::new(MacAddr::BROADCAST, MacAddr::NIL)
/// #         / Ipv4::new([1,2,3,4].into(), [5,6,7,8].into(), 64)
/// #         / Udp::new(1, 2)).serialize().unwrap()
/// # };
/// let layer = dissect(LinkType::Ethernet, &frame).unwrap();
/// assert_eq!(LayerKind::Ethernet2, layer.kind());
/// ```
pub fn dissect(link_type: LinkType, bytes: &[u8]) -> Result<Layer, DissectError> {
    match link_type {
        LinkType::Null => Loopback::dissect(bytes).map(Layer::Loopback),
        LinkType::Ethernet => Ethernet2::dissect(bytes).map(Layer::Ethernet2),
        LinkType::Ieee802_11 => dissect_dot11(bytes),
        LinkType::LinuxSll => LinuxSll::dissect(bytes).map(Layer::LinuxSll),
        LinkType::Ieee802_11RadioTap => RadioTap::dissect(bytes).map(Layer::RadioTap),
        LinkType::Ppi => Ppi::dissect(bytes).map(Layer::Ppi),
    }
}

/// Dissect a captured frame identified by a raw libpcap DLT value.
///
/// User registrations made with [`register_link_type`] take precedence;
/// unknown DLT values yield the frame as a [`RawPayload`].
pub fn dissect_dlt(dlt_value: u32, bytes: &[u8]) -> Result<Layer, DissectError> {
    if let Some(constructor) = user_link_type(dlt_value) {
        return constructor(bytes);
    }
    match LinkType::from_dlt_value(dlt_value) {
        Some(link_type) => dissect(link_type, bytes),
        None => Ok(Layer::Raw(RawPayload::new(bytes.to_vec()))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dlt_round_trip() {
        for link_type in [
            LinkType::Null,
            LinkType::Ethernet,
            LinkType::Ieee802_11,
            LinkType::LinuxSll,
            LinkType::Ieee802_11RadioTap,
            LinkType::Ppi,
        ] {
            assert_eq!(
                Some(link_type),
                LinkType::from_dlt_value(link_type.dlt_value())
            );
        }
        assert_eq!(None, LinkType::from_dlt_value(9999));
    }

    #[test]
    fn unknown_dlt_yields_raw() {
        let layer = dissect_dlt(9999, &[1, 2, 3]).unwrap();
        assert_eq!(LayerKind::Raw, layer.kind());
    }
}
