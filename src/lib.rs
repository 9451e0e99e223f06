//! Ethernet link endpoint for paravirtualized network devices.
//!
//! This crate re-exports the workspace members so consumers depend on a single package:
//! - [`ethernet`]: in-place Ethernet II header access and hardware addresses;
//! - [`device`]: the netfront device contract plus an in-memory device with a simulated back end;
//! - the link endpoint itself ([`NetfrontEndpoint`] and the [`LinkEndpoint`] contract).
#![forbid(unsafe_code)]

pub use netfront_device as device;
pub use netfront_ethernet as ethernet;

pub use netfront_link::*;
