use std::sync::{Arc, OnceLock};

use netfront_device::{Buffer, NetDevice, RxResponse, NETIF_RSP_NULL};
use netfront_ethernet::{EthernetHeader, MacAddr, ETHERNET_HEADER_LEN};

use crate::buffer::{Prependable, VectorisedView, View};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::stack::{LinkEndpoint, NetworkDispatcher, NetworkProtocolNumber, Route};
use crate::stats::{LinkStats, LinkStatsSnapshot};

/// Outcome of one [`NetfrontEndpoint::process_rx`] pass.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxCounts {
    /// Responses popped off the RX ring (and their pages returned).
    pub completions: usize,
    /// Packets handed to the dispatcher.
    pub delivered: usize,
    /// Whether the back end was notified after re-posting pages.
    pub notified: bool,
}

/// Ethernet link endpoint on top of a netfront device.
///
/// Transmit and identity queries run on the caller's thread. Attaching a dispatcher spawns one RX
/// worker that lives as long as the process; the endpoint is shared with it through an `Arc`.
pub struct NetfrontEndpoint<D> {
    device: D,
    mac: MacAddr,
    config: LinkConfig,
    dispatcher: OnceLock<Arc<dyn NetworkDispatcher>>,
    stats: LinkStats,
}

impl<D: NetDevice + 'static> NetfrontEndpoint<D> {
    pub fn new(device: D) -> Result<Self> {
        Self::with_config(device, LinkConfig::default())
    }

    /// Build an endpoint, parsing the device's hardware-address string.
    pub fn with_config(device: D, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let raw = device.mac_addr();
        let mac = raw
            .parse::<MacAddr>()
            .map_err(|source| LinkError::InvalidLinkAddress {
                input: raw.to_owned(),
                source,
            })?;
        Ok(Self {
            device,
            mac,
            config,
            dispatcher: OnceLock::new(),
            stats: LinkStats::default(),
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_attached(&self) -> bool {
        self.dispatcher.get().is_some()
    }

    /// Copy the framed header and payload into a TX page and hand it to the device.
    ///
    /// The MTU bound checked by `write_packet` keeps `hdr` + `payload` within one page.
    fn write_ethernet_packet(&self, hdr: &[u8], payload: &[u8]) -> Result<()> {
        let len = hdr.len() + payload.len();
        let mut buf = self.device.get_tx_buffer()?;
        let page = buf.page_mut();
        page[..hdr.len()].copy_from_slice(hdr);
        page[hdr.len()..len].copy_from_slice(payload);
        self.device.send_tx_buffer(buf, len)?;
        self.stats.tx_frame(len);

        if self.device.push_tx_requests() {
            self.stats.tx_notification();
            self.device.event_channel().notify();
        }
        Ok(())
    }

    /// Drain every pending RX completion into `dispatcher`, re-post the pages and prod the back end
    /// if it asked for it.
    ///
    /// This is one iteration of the RX worker minus the wait; embedders that run their own event
    /// loop can call it directly. A device fault aborts the pass.
    pub fn process_rx(&self, dispatcher: &dyn NetworkDispatcher) -> Result<RxCounts> {
        let mut counts = RxCounts::default();

        while self.device.check_for_rx_responses() {
            let Some(rsp) = self.device.next_rx_response() else {
                break;
            };
            let buf = self.device.lookup_rx_buffer(rsp.id)?;
            if self.deliver_packet(&rsp, &buf, dispatcher) {
                counts.delivered += 1;
            }
            self.device.send_rx_buffer(buf)?;
            counts.completions += 1;
        }

        if self.device.push_rx_requests() {
            self.stats.rx_notification();
            self.device.event_channel().notify();
            counts.notified = true;
        }
        Ok(counts)
    }

    /// Strip the ethernet header from a completed RX page and dispatch the payload.
    ///
    /// Returns whether the dispatcher was called.
    fn deliver_packet(
        &self,
        rsp: &RxResponse,
        buf: &Buffer,
        dispatcher: &dyn NetworkDispatcher,
    ) -> bool {
        if rsp.status <= NETIF_RSP_NULL {
            tracing::trace!(id = rsp.id, status = rsp.status, "null rx completion");
            self.stats.rx_null();
            return false;
        }

        let size = rsp.status as usize;
        let offset = rsp.offset as usize;
        let frame = match buf.page().get(offset..offset + size) {
            Some(frame) if size >= ETHERNET_HEADER_LEN => frame,
            _ => {
                tracing::warn!(
                    id = rsp.id,
                    offset,
                    size,
                    "malformed rx completion; discarding"
                );
                self.stats.rx_malformed();
                return false;
            }
        };

        // The page goes straight back to the device, so the packet gets its own copy.
        let mut view = View::from(frame);
        let (remote, protocol) = {
            let eth = EthernetHeader::new_unchecked(&view[..ETHERNET_HEADER_LEN]);
            (eth.src_addr(), eth.ethertype())
        };
        view.trim_front(ETHERNET_HEADER_LEN);

        tracing::trace!(
            id = rsp.id,
            %remote,
            protocol,
            len = view.len(),
            flags = ?rsp.flags,
            "rx packet"
        );
        self.stats.rx_delivered(view.len());
        dispatcher.deliver_network_packet(self, remote, protocol, VectorisedView::from(view));
        true
    }

    fn rx_loop(self: Arc<Self>) {
        let Some(dispatcher) = self.dispatcher.get().cloned() else {
            return;
        };
        let _span = tracing::debug_span!("netfront_rx", mac = %self.mac).entered();

        loop {
            self.device.event_channel().wait();
            if let Err(err) = self.process_rx(dispatcher.as_ref()) {
                tracing::error!("netfront rx worker stopped: {err}");
                return;
            }
        }
    }
}

impl<D: NetDevice + 'static> LinkEndpoint for NetfrontEndpoint<D> {
    fn mtu(&self) -> u32 {
        self.config.mtu
    }

    fn max_header_length(&self) -> u16 {
        ETHERNET_HEADER_LEN as u16
    }

    fn link_address(&self) -> MacAddr {
        self.mac
    }

    fn write_packet(
        &self,
        route: &Route,
        hdr: &mut Prependable,
        payload: &[u8],
        protocol: NetworkProtocolNumber,
    ) -> Result<()> {
        // No address resolution here: without a next-hop address the packet is dropped.
        let Some(remote) = route.remote_link_address else {
            tracing::debug!(protocol, "dropping packet with missing remote link address");
            self.stats.tx_dropped_unresolved();
            return Ok(());
        };

        let len = hdr.used_len() + payload.len();
        let mtu = self.config.mtu as usize;
        if len > mtu {
            return Err(LinkError::PacketTooLarge { len, mtu });
        }

        let available = hdr.available();
        let eth = hdr
            .prepend(ETHERNET_HEADER_LEN)
            .ok_or(LinkError::HeaderSpace {
                needed: ETHERNET_HEADER_LEN,
                available,
            })?;
        let mut eth = EthernetHeader::new_unchecked(eth);
        eth.set_destination(remote);
        eth.set_source(self.mac);
        eth.set_ethertype(protocol);

        let sent = self.write_ethernet_packet(hdr.used_bytes(), payload);
        if sent.is_err() {
            // Hand `hdr` back as it came in so the caller can retry the same packet.
            hdr.release(ETHERNET_HEADER_LEN);
        }
        sent
    }

    fn attach(self: Arc<Self>, dispatcher: Arc<dyn NetworkDispatcher>) -> Result<()> {
        self.dispatcher
            .set(dispatcher)
            .map_err(|_| LinkError::AlreadyAttached)?;

        let name = self.config.rx_thread_name.clone();
        tracing::info!(mac = %self.mac, thread = %name, "attaching netfront link");
        std::thread::Builder::new()
            .name(name)
            .spawn(move || self.rx_loop())
            .map_err(LinkError::SpawnRxWorker)?;
        Ok(())
    }
}
