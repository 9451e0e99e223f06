//! Ethernet link endpoint for a paravirtualized (netfront-style) network device.
//!
//! [`NetfrontEndpoint`] adapts a [`netfront_device::NetDevice`] to the [`LinkEndpoint`] contract a
//! protocol stack expects:
//! - transmit prepends a 14-byte ethernet header, copies header + payload into a device TX page and
//!   rings the back end when the TX ring asks for it;
//! - [`LinkEndpoint::attach`] starts a worker that waits on the device event channel, strips the
//!   ethernet header from each completed RX page, dispatches the payload and re-posts the page.
//!
//! Packets routed without a resolved next-hop hardware address are dropped; there is no address
//! resolution queue.
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod stack;
pub mod stats;

pub use buffer::{Prependable, VectorisedView, View};
pub use config::LinkConfig;
pub use endpoint::{NetfrontEndpoint, RxCounts};
pub use error::{LinkError, Result};
pub use stack::{LinkEndpoint, NetworkDispatcher, NetworkProtocolNumber, Route};
pub use stats::{LinkStats, LinkStatsSnapshot};
