#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use netfront_device::{MemDevice, MemDeviceConfig};
use netfront_ethernet::MacAddr;
use netfront_link::{LinkEndpoint, NetfrontEndpoint, NetworkDispatcher, VectorisedView};

pub const LOCAL_MAC: &str = "00:16:3e:12:34:56";
pub const LOCAL: MacAddr = MacAddr([0x00, 0x16, 0x3e, 0x12, 0x34, 0x56]);
pub const REMOTE: MacAddr = MacAddr([0x52, 0x54, 0x00, 0xab, 0xcd, 0xef]);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn small_config() -> MemDeviceConfig {
    MemDeviceConfig {
        tx_buffers: 4,
        rx_buffers: 4,
        ring_size: 8,
        rx_offset: 0,
    }
}

pub fn endpoint(config: MemDeviceConfig) -> (Arc<MemDevice>, NetfrontEndpoint<Arc<MemDevice>>) {
    let dev = Arc::new(MemDevice::with_config(LOCAL_MAC, config).unwrap());
    let ep = NetfrontEndpoint::new(dev.clone()).unwrap();
    (dev, ep)
}

/// Build `dst ∥ src ∥ ethertype ∥ payload`.
pub fn frame(dst: MacAddr, src: MacAddr, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + payload.len());
    out.extend_from_slice(&dst.0);
    out.extend_from_slice(&src.0);
    out.extend_from_slice(&ethertype.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub link: MacAddr,
    pub remote: MacAddr,
    pub protocol: u16,
    pub segments: usize,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub struct Recorder {
    packets: Mutex<Vec<Delivered>>,
}

impl Recorder {
    pub fn packets(&self) -> Vec<Delivered> {
        self.packets.lock().unwrap().clone()
    }
}

impl NetworkDispatcher for Recorder {
    fn deliver_network_packet(
        &self,
        link: &dyn LinkEndpoint,
        remote: MacAddr,
        protocol: u16,
        packet: VectorisedView,
    ) {
        self.packets.lock().unwrap().push(Delivered {
            link: link.link_address(),
            remote,
            protocol,
            segments: packet.views().len(),
            payload: packet.to_vec(),
        });
    }
}
