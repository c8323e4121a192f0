mod tcp;
pub use tcp::*;

mod udp;
pub use udp::*;
