mod dhcp;
pub use dhcp::*;

mod dhcpv6;
pub use dhcpv6::*;

mod eapol;
pub use eapol::*;
