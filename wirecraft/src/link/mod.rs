mod mac_addr;
pub use mac_addr::*;

mod ethernet2;
pub use ethernet2::*;

mod dot3;
pub use dot3::*;

mod llc;
pub use llc::*;

mod snap;
pub use snap::*;

mod loopback;
pub use loopback::*;

mod linux_sll;
pub use linux_sll::*;

mod ppi;
pub use ppi::*;

mod radiotap;
pub use radiotap::*;

mod dot1q;
pub use dot1q::*;

mod mpls;
pub use mpls::*;

mod pppoe;
pub use pppoe::*;
