mod arp;
pub use arp::*;

mod ipv4;
pub use ipv4::*;

mod ipv6;
pub use ipv6::*;

mod ipsec;
pub use ipsec::*;

mod icmp_extension;
pub use icmp_extension::*;

mod icmpv4;
pub use icmpv4::*;

mod icmpv6;
pub use icmpv6::*;
