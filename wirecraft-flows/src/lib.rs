//! Reconstruction of fragmented IPv4 datagrams and TCP byte streams on
//! top of [`wirecraft`]'s layer model.
//!
//! # Reassembling fragmented IPv4 packets
//!
//! Feed dissected packets into a [`Reassembler`]; when the return value
//! is [`ReassemblyStatus::Fragmented`] the datagram is not complete yet,
//! otherwise the packet can be processed normally (on
//! [`ReassemblyStatus::Reassembled`] the passed layer has been rewritten
//! in place to hold the whole payload):
//!
//! ```
//! use wirecraft_flows::{Reassembler, ReassemblyStatus};
//!
//! let mut reassembler = Reassembler::new();
//! # let mut packet: wirecraft::Layer =
//! #     wirecraft::Ipv4::new([1, 2, 3, 4].into(), [5, 6, 7, 8].into(), 64).into();
//! if reassembler.process(&mut packet) != ReassemblyStatus::Fragmented {
//!     // process the packet
//! }
//! ```
//!
//! # Following TCP streams
//!
//! A [`StreamFollower`] tracks both directions of every TCP conversation
//! it sees and invokes callbacks as payload bytes become available in
//! order:
//!
//! ```
//! use wirecraft_flows::StreamFollower;
//!
//! let mut follower = StreamFollower::new();
//! follower.new_stream_callback(|stream| {
//!     stream.client_data_callback(|stream| {
//!         println!("client sent {} bytes", stream.client_payload().len());
//!     });
//! });
//! ```

pub mod err;

mod seq;
pub use crate::seq::*;

mod reassembler;
pub use crate::reassembler::*;

mod data_tracker;
pub use crate::data_tracker::*;

#[cfg(feature = "ack-tracker")]
mod ack_tracker;
#[cfg(feature = "ack-tracker")]
pub use crate::ack_tracker::*;

mod flow;
pub use crate::flow::*;

mod stream;
pub use crate::stream::*;

mod stream_id;
pub use crate::stream_id::*;

mod follower;
pub use crate::follower::*;
