mod common;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{frame, init_tracing, small_config, Recorder, LOCAL, LOCAL_MAC, REMOTE};
use netfront_device::MemDevice;
use netfront_ethernet::MacAddr;
use netfront_link::{
    LinkConfig, LinkEndpoint, LinkError, NetfrontEndpoint, NetworkDispatcher, VectorisedView,
};

const TIMEOUT: Duration = Duration::from_secs(10);

struct ChannelDispatcher(Mutex<mpsc::Sender<(String, MacAddr, u16, Vec<u8>)>>);

impl NetworkDispatcher for ChannelDispatcher {
    fn deliver_network_packet(
        &self,
        _link: &dyn LinkEndpoint,
        remote: MacAddr,
        protocol: u16,
        packet: VectorisedView,
    ) {
        let thread = std::thread::current().name().unwrap_or_default().to_owned();
        let _ = self
            .0
            .lock()
            .unwrap()
            .send((thread, remote, protocol, packet.to_vec()));
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn attach_starts_a_worker_that_delivers_packets() {
    init_tracing();
    let dev = Arc::new(MemDevice::with_config(LOCAL_MAC, small_config()).unwrap());
    let config = LinkConfig {
        rx_thread_name: "eth-test-rx".to_owned(),
        ..LinkConfig::default()
    };
    let ep = Arc::new(NetfrontEndpoint::with_config(dev.clone(), config).unwrap());

    let (tx, rx) = mpsc::channel();
    ep.clone()
        .attach(Arc::new(ChannelDispatcher(Mutex::new(tx))))
        .unwrap();
    assert!(ep.is_attached());

    for payload in [&b"ping"[..], &b"pong"[..]] {
        dev.backend_receive(&frame(LOCAL, REMOTE, 0x0800, payload))
            .unwrap()
            .unwrap();
        let (thread, remote, protocol, bytes) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(thread, "eth-test-rx");
        assert_eq!(remote, REMOTE);
        assert_eq!(protocol, 0x0800);
        assert_eq!(bytes, payload);
    }

    // Pages are handed back after delivery.
    assert!(wait_until(|| dev.rx_held() == small_config().rx_buffers));
}

#[test]
fn worker_keeps_up_with_more_frames_than_pages() {
    init_tracing();
    let dev = Arc::new(MemDevice::with_config(LOCAL_MAC, small_config()).unwrap());
    let ep = Arc::new(NetfrontEndpoint::new(dev.clone()).unwrap());
    let recorder = Arc::new(Recorder::default());
    ep.clone().attach(recorder.clone()).unwrap();

    let total = small_config().rx_buffers * 4;
    let mut sent = 0;
    while sent < total {
        // Only send when a page is posted; otherwise give the worker a moment.
        let payload = [sent as u8; 8];
        if dev
            .backend_receive(&frame(LOCAL, REMOTE, 0x0800, &payload))
            .unwrap()
            .is_some()
        {
            sent += 1;
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    assert!(wait_until(|| recorder.packets().len() == total));
    let payloads: Vec<u8> = recorder.packets().iter().map(|p| p.payload[0]).collect();
    assert_eq!(payloads, (0..total as u8).collect::<Vec<_>>());
}

/// Attachment is one-shot. The endpoint refuses a second dispatcher instead of racing two workers
/// over the same RX ring; callers should not rely on re-attaching.
#[test]
fn second_attach_is_refused() {
    let dev = Arc::new(MemDevice::with_config(LOCAL_MAC, small_config()).unwrap());
    let ep = Arc::new(NetfrontEndpoint::new(dev).unwrap());

    ep.clone().attach(Arc::new(Recorder::default())).unwrap();
    let err = ep
        .clone()
        .attach(Arc::new(Recorder::default()))
        .unwrap_err();
    assert!(matches!(err, LinkError::AlreadyAttached));
}
