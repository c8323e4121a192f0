/// Identifies the protocol of a [`crate::Layer`].
///
/// Besides the concrete protocols the enum carries the abstract family
/// kind [`LayerKind::Dot11`] which never appears as the kind of a concrete
/// layer but is accepted by [`crate::Layer::matches_kind`] and the
/// chain search functions to match any 802.11 frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayerKind {
    Ethernet2,
    Dot3,
    Llc,
    Snap,
    Loopback,
    LinuxSll,
    Ppi,
    RadioTap,
    /// Abstract family kind matching any 802.11 frame.
    Dot11,
    Dot11Mgmt,
    Dot11Control,
    Dot11Data,
    Dot1Q,
    Mpls,
    Pppoe,
    Eapol,
    Arp,
    Ipv4,
    Ipv6,
    IpsecAh,
    IpsecEsp,
    Icmpv4,
    Icmpv6,
    Tcp,
    Udp,
    Dhcp,
    Dhcpv6,
    Raw,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_clone_eq() {
        let kind = LayerKind::Ipv4;
        assert_eq!("Ipv4", format!("{:?}", kind));
        assert_eq!(kind, kind.clone());
        assert_ne!(LayerKind::Dot11, LayerKind::Dot11Mgmt);
    }
}
