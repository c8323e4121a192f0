use crate::err::DissectError;
use crate::*;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// `EtherType` values of the protocols known to the dispatch tables.
pub mod ether_type {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN_TAGGED: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const MPLS_UNICAST: u16 = 0x8847;
    pub const MPLS_MULTICAST: u16 = 0x8848;
    pub const PPPOE_DISCOVERY: u16 = 0x8863;
    pub const PPPOE_SESSION: u16 = 0x8864;
    pub const EAPOL: u16 = 0x888E;
    pub const PROVIDER_BRIDGING: u16 = 0x88A8;
    pub const VLAN_DOUBLE_OLD: u16 = 0x9100;
}

/// IP protocol numbers of the protocols known to the dispatch tables.
pub mod ip_number {
    pub const ICMP: u8 = 1;
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6: u8 = 41;
    pub const ESP: u8 = 50;
    pub const AH: u8 = 51;
    pub const ICMPV6: u8 = 58;
}

/// Data link type identifiers (libpcap numbering).
pub mod dlt {
    pub const NULL: u32 = 0;
    pub const EN10MB: u32 = 1;
    pub const IEEE802_11: u32 = 105;
    pub const LINUX_SLL: u32 = 113;
    pub const IEEE802_11_RADIO: u32 = 127;
    pub const PPI: u32 = 192;
}

/// Constructor registered for a next-protocol identifier.
pub type LayerConstructor = fn(&[u8]) -> Result<Layer, DissectError>;

static USER_ETHER_TYPES: LazyLock<RwLock<HashMap<u16, LayerConstructor>>> =
    LazyLock::new(Default::default);
static USER_IP_NUMBERS: LazyLock<RwLock<HashMap<u8, LayerConstructor>>> =
    LazyLock::new(Default::default);
static USER_LINK_TYPES: LazyLock<RwLock<HashMap<u32, LayerConstructor>>> =
    LazyLock::new(Default::default);

/// Register a constructor for an `EtherType` value, overriding the
/// built-in mapping for that value.
///
/// The registration is honored by every layer that dispatches on
/// `EtherType` (Ethernet II, 802.1Q, SNAP, Linux cooked capture).
/// Registration must happen before the first dissection that should
/// see it.
pub fn register_ether_type(id: u16, constructor: LayerConstructor) {
    USER_ETHER_TYPES
        .write()
        .expect("ether type registry poisoned")
        .insert(id, constructor);
}

/// Register a constructor for an IP protocol number, overriding the
/// built-in mapping for that value (honored by IPv4 and IPv6).
pub fn register_ip_number(id: u8, constructor: LayerConstructor) {
    USER_IP_NUMBERS
        .write()
        .expect("ip number registry poisoned")
        .insert(id, constructor);
}

/// Register a constructor for a DLT value, overriding the built-in
/// mapping used by [`dissect_dlt`](crate::dissect_dlt).
pub fn register_link_type(id: u32, constructor: LayerConstructor) {
    USER_LINK_TYPES
        .write()
        .expect("link type registry poisoned")
        .insert(id, constructor);
}

fn user_ether_type(id: u16) -> Option<LayerConstructor> {
    USER_ETHER_TYPES
        .read()
        .expect("ether type registry poisoned")
        .get(&id)
        .copied()
}

fn user_ip_number(id: u8) -> Option<LayerConstructor> {
    USER_IP_NUMBERS
        .read()
        .expect("ip number registry poisoned")
        .get(&id)
        .copied()
}

pub(crate) fn user_link_type(id: u32) -> Option<LayerConstructor> {
    USER_LINK_TYPES
        .read()
        .expect("link type registry poisoned")
        .get(&id)
        .copied()
}

/// Build the layer identified by an `EtherType` value from `bytes`.
///
/// User registrations take precedence over the built-in mapping; when
/// neither knows the identifier the bytes are kept as [`RawPayload`].
pub fn layer_from_ether_type(id: u16, bytes: &[u8]) -> Result<Layer, DissectError> {
    if let Some(constructor) = user_ether_type(id) {
        return constructor(bytes);
    }
    use self::ether_type::*;
    match id {
        IPV4 => Ipv4::dissect(bytes).map(Layer::Ipv4),
        IPV6 => Ipv6::dissect(bytes).map(Layer::Ipv6),
        ARP => Arp::dissect(bytes).map(Layer::Arp),
        VLAN_TAGGED | PROVIDER_BRIDGING | VLAN_DOUBLE_OLD => {
            Dot1Q::dissect(bytes).map(Layer::Dot1Q)
        }
        MPLS_UNICAST | MPLS_MULTICAST => Mpls::dissect(bytes).map(Layer::Mpls),
        PPPOE_DISCOVERY | PPPOE_SESSION => Pppoe::dissect(bytes).map(Layer::Pppoe),
        EAPOL => Eapol::dissect(bytes).map(Layer::Eapol),
        _ => Ok(Layer::Raw(RawPayload::new(bytes.to_vec()))),
    }
}

/// Build the layer identified by an IP protocol number from `bytes`.
pub fn layer_from_ip_number(id: u8, bytes: &[u8]) -> Result<Layer, DissectError> {
    if let Some(constructor) = user_ip_number(id) {
        return constructor(bytes);
    }
    use self::ip_number::*;
    match id {
        TCP => Tcp::dissect(bytes).map(Layer::Tcp),
        UDP => Udp::dissect(bytes).map(Layer::Udp),
        ICMP => Icmpv4::dissect(bytes).map(Layer::Icmpv4),
        ICMPV6 => Icmpv6::dissect(bytes).map(Layer::Icmpv6),
        IPV6 => Ipv6::dissect(bytes).map(Layer::Ipv6),
        IPIP => Ipv4::dissect(bytes).map(Layer::Ipv4),
        AH => IpsecAh::dissect(bytes).map(Layer::IpsecAh),
        ESP => IpsecEsp::dissect(bytes).map(Layer::IpsecEsp),
        _ => Ok(Layer::Raw(RawPayload::new(bytes.to_vec()))),
    }
}

/// The `EtherType` that identifies `layer` when it is carried below an
/// Ethernet II, 802.1Q, SNAP or Linux cooked header.
pub(crate) fn ether_type_for_layer(layer: &Layer) -> Option<u16> {
    use self::ether_type::*;
    match layer {
        Layer::Ipv4(_) => Some(IPV4),
        Layer::Ipv6(_) => Some(IPV6),
        Layer::Arp(_) => Some(ARP),
        Layer::Dot1Q(_) => Some(VLAN_TAGGED),
        Layer::Mpls(_) => Some(MPLS_UNICAST),
        Layer::Eapol(_) => Some(EAPOL),
        Layer::Pppoe(pppoe) => {
            if pppoe.code == 0 {
                Some(PPPOE_SESSION)
            } else {
                Some(PPPOE_DISCOVERY)
            }
        }
        _ => None,
    }
}

/// The IP protocol number that identifies `layer` when it is carried
/// below an IPv4 or IPv6 header.
pub(crate) fn ip_number_for_layer(layer: &Layer) -> Option<u8> {
    use self::ip_number::*;
    match layer.kind() {
        LayerKind::Tcp => Some(TCP),
        LayerKind::Udp => Some(UDP),
        LayerKind::Icmpv4 => Some(ICMP),
        LayerKind::Icmpv6 => Some(ICMPV6),
        LayerKind::Ipv6 => Some(IPV6),
        LayerKind::Ipv4 => Some(IPIP),
        LayerKind::IpsecAh => Some(AH),
        LayerKind::IpsecEsp => Some(ESP),
        _ => None,
    }
}
