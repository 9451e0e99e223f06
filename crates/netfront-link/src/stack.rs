//! Link-layer contract between a protocol stack and a link endpoint.

use std::sync::Arc;

use netfront_ethernet::MacAddr;

use crate::buffer::{Prependable, VectorisedView};
use crate::error::Result;

/// Network-layer protocol carried in the ethertype field.
pub type NetworkProtocolNumber = u16;

/// The slice of a route the link layer needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Route {
    /// `None` until address resolution has produced the next hop's hardware address.
    pub remote_link_address: Option<MacAddr>,
}

impl Route {
    pub fn to(remote: MacAddr) -> Self {
        Self {
            remote_link_address: Some(remote),
        }
    }

    pub fn unresolved() -> Self {
        Self::default()
    }
}

/// Upper-layer recipient of decoded packets.
pub trait NetworkDispatcher: Send + Sync {
    fn deliver_network_packet(
        &self,
        link: &dyn LinkEndpoint,
        remote: MacAddr,
        protocol: NetworkProtocolNumber,
        packet: VectorisedView,
    );
}

impl<F> NetworkDispatcher for F
where
    F: Fn(&dyn LinkEndpoint, MacAddr, NetworkProtocolNumber, VectorisedView) + Send + Sync,
{
    fn deliver_network_packet(
        &self,
        link: &dyn LinkEndpoint,
        remote: MacAddr,
        protocol: NetworkProtocolNumber,
        packet: VectorisedView,
    ) {
        self(link, remote, protocol, packet)
    }
}

/// Interface a protocol stack uses to drive a link.
pub trait LinkEndpoint: Send + Sync {
    fn mtu(&self) -> u32;

    fn max_header_length(&self) -> u16;

    fn link_address(&self) -> MacAddr;

    /// Frame `hdr` + `payload` and hand it to the link.
    ///
    /// `hdr` holds the upper-layer headers already written; the link header is prepended into its
    /// remaining reserve.
    fn write_packet(
        &self,
        route: &Route,
        hdr: &mut Prependable,
        payload: &[u8],
        protocol: NetworkProtocolNumber,
    ) -> Result<()>;

    /// Register the dispatcher and start delivering inbound packets to it.
    fn attach(self: Arc<Self>, dispatcher: Arc<dyn NetworkDispatcher>) -> Result<()>;
}
