//! A library for dissecting & crafting a bunch of packet based protocols
//! (Ethernet II, IPv4, IPv6, TCP, UDP, ICMP, 802.1Q, MPLS, PPPoE, 802.11 ...).
//!
//! Every protocol is modeled as a [`Layer`]: an entity that can be built
//! from a raw byte buffer (dissection) or assembled field by field
//! (crafting) and serialized back into a buffer that is bit-identical to a
//! well formed on-wire frame. Layers own an optional inner layer, forming a
//! chain from the outermost protocol down to the payload.
//!
//! # Dissecting a frame
//!
//! ```
//! use wirecraft::{dissect, LinkType, LayerKind};
//!
//! # let frame = {
//! #     use wirecraft::*;
//! #     let l = Ethernet2::new([0,1,2,3,4,5].into(), [6,7,8,9,10,11].into())
//! #         / Ipv4::new([192,168,1,1].into(), [192,168,1,2].into(), 64)
//! #         / Udp::new(5353, 5353)
//! #         / RawPayload::new(b"hello".to_vec());
//! #     l.serialize().unwrap()
//! # };
//! let layer = dissect(LinkType::Ethernet, &frame).unwrap();
//! if let Some(udp) = layer.find(LayerKind::Udp) {
//!     println!("udp: {:?}", udp);
//! }
//! ```
//!
//! # Crafting a frame
//!
//! Layers are chained with the `/` operator. Dependent fields (EtherType,
//! IP protocol numbers, length fields, checksums) are derived while
//! serializing:
//!
//! ```
//! use wirecraft::{Ethernet2, Ipv4, Udp, RawPayload, MacAddr};
//!
//! let packet = Ethernet2::new(MacAddr::BROADCAST, MacAddr::NIL)
//!     / Ipv4::new([127,0,0,1].into(), [127,0,0,1].into(), 64)
//!     / Udp::new(1234, 53)
//!     / RawPayload::new(b"payload".to_vec());
//!
//! let bytes = packet.serialize().unwrap();
//! ```

pub mod err;

/// Helpers for calculating checksums.
pub mod checksum;

mod bytes;
pub use crate::bytes::*;

mod layer;
pub use crate::layer::*;

mod options;
pub use crate::options::*;

mod link;
pub use crate::link::*;

mod net;
pub use crate::net::*;

mod transport;
pub use crate::transport::*;

mod dot11;
pub use crate::dot11::*;

mod app;
pub use crate::app::*;
