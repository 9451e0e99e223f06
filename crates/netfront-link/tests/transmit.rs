mod common;

use std::sync::Arc;

use common::{endpoint, frame, small_config, LOCAL, LOCAL_MAC, REMOTE};
use netfront_device::{DeviceError, MemDevice};
use netfront_ethernet::EtherType;
use netfront_link::{
    LinkConfig, LinkEndpoint, LinkError, NetfrontEndpoint, Prependable, Route,
};

#[test]
fn identity_queries() {
    let (_dev, ep) = endpoint(small_config());
    assert_eq!(ep.mtu(), 1500);
    assert_eq!(ep.max_header_length(), 14);
    assert_eq!(ep.link_address(), LOCAL);
    assert!(!ep.is_attached());
}

#[test]
fn malformed_device_address_is_rejected() {
    for bad in ["", "00:16:3e:12:34", "00:16:3e:12:34:zz", "0016.3e12.3456"] {
        let dev = MemDevice::new(bad).unwrap();
        match NetfrontEndpoint::new(dev) {
            Err(LinkError::InvalidLinkAddress { input, .. }) => assert_eq!(input, bad),
            Err(other) => panic!("unexpected error for {bad:?}: {other}"),
            Ok(_) => panic!("accepted {bad:?}"),
        }
    }
}

#[test]
fn unresolved_destination_is_dropped_without_touching_the_device() {
    let (dev, ep) = endpoint(small_config());
    let free_before = dev.tx_free();

    let mut hdr = Prependable::new(ep.max_header_length() as usize);
    ep.write_packet(&Route::unresolved(), &mut hdr, b"payload", EtherType::IPV4)
        .unwrap();

    assert_eq!(hdr.used_len(), 0);
    assert_eq!(dev.tx_free(), free_before);
    assert_eq!(dev.events().notifications(), 0);
    assert!(dev.backend_transmit().is_empty());

    let stats = ep.stats();
    assert_eq!(stats.tx_dropped_unresolved, 1);
    assert_eq!(stats.tx_frames, 0);
    assert_eq!(stats.tx_notifications, 0);
}

#[test]
fn frame_is_remote_local_type_then_payload() {
    let (dev, ep) = endpoint(small_config());

    let mut hdr = Prependable::new(14);
    ep.write_packet(&Route::to(REMOTE), &mut hdr, b"hello", EtherType::IPV4)
        .unwrap();

    let frames = dev.backend_transmit();
    assert_eq!(frames, vec![frame(REMOTE, LOCAL, 0x0800, b"hello")]);
    assert_eq!(&frames[0][12..14], &[0x08, 0x00]);
    assert_eq!(ep.stats().tx_bytes, 19);
}

#[test]
fn upper_layer_headers_sit_between_link_header_and_payload() {
    let (dev, ep) = endpoint(small_config());

    let mut hdr = Prependable::new(14 + 4);
    hdr.prepend(4).unwrap().copy_from_slice(b"IPHD");
    ep.write_packet(&Route::to(REMOTE), &mut hdr, b"data", EtherType::IPV6)
        .unwrap();

    let frames = dev.backend_transmit();
    assert_eq!(frames, vec![frame(REMOTE, LOCAL, 0x86dd, b"IPHDdata")]);
}

#[test]
fn notifies_only_when_the_tx_ring_asks() {
    let (dev, ep) = endpoint(small_config());
    let route = Route::to(REMOTE);

    // Fresh ring: the back end wants to hear about the first request.
    ep.write_packet(&route, &mut Prependable::new(14), b"a", 1)
        .unwrap();
    assert_eq!(dev.events().notifications(), 1);

    // The back end has not caught up, so the doorbell is still pending.
    ep.write_packet(&route, &mut Prependable::new(14), b"b", 2)
        .unwrap();
    assert_eq!(dev.events().notifications(), 1);

    // Draining re-arms the back end's event threshold.
    assert_eq!(dev.backend_transmit().len(), 2);
    ep.write_packet(&route, &mut Prependable::new(14), b"c", 3)
        .unwrap();
    assert_eq!(dev.events().notifications(), 2);

    assert_eq!(ep.stats().tx_notifications, 2);
    assert_eq!(ep.stats().tx_frames, 3);
}

#[test]
fn missing_header_space_is_an_error() {
    let (dev, ep) = endpoint(small_config());
    let free_before = dev.tx_free();

    let err = ep
        .write_packet(&Route::to(REMOTE), &mut Prependable::new(10), b"x", 1)
        .unwrap_err();
    assert!(matches!(
        err,
        LinkError::HeaderSpace {
            needed: 14,
            available: 10
        }
    ));
    assert_eq!(dev.tx_free(), free_before);
}

#[test]
fn packets_over_the_mtu_are_rejected_before_taking_a_buffer() {
    let dev = Arc::new(MemDevice::with_config(LOCAL_MAC, small_config()).unwrap());
    let config = LinkConfig {
        mtu: 576,
        ..LinkConfig::default()
    };
    let ep = NetfrontEndpoint::with_config(dev.clone(), config).unwrap();
    let free_before = dev.tx_free();

    // Upper-layer headers count towards the MTU; the link header does not.
    let mut hdr = Prependable::new(14 + 20);
    hdr.prepend(20).unwrap();
    let err = ep
        .write_packet(&Route::to(REMOTE), &mut hdr, &[0u8; 557], 1)
        .unwrap_err();
    assert!(matches!(err, LinkError::PacketTooLarge { len: 577, mtu: 576 }));
    assert_eq!(hdr.used_len(), 20);
    assert_eq!(dev.tx_free(), free_before);

    ep.write_packet(&Route::to(REMOTE), &mut hdr, &[0u8; 556], 1)
        .unwrap();
    assert_eq!(dev.backend_transmit()[0].len(), 14 + 576);
}

#[test]
fn pool_exhaustion_surfaces_as_device_error() {
    let (dev, ep) = endpoint(small_config());
    let route = Route::to(REMOTE);

    for _ in 0..small_config().tx_buffers {
        ep.write_packet(&route, &mut Prependable::new(14), b"x", 1)
            .unwrap();
    }
    let err = ep
        .write_packet(&route, &mut Prependable::new(14), b"x", 1)
        .unwrap_err();
    assert!(matches!(
        err,
        LinkError::Device(DeviceError::TxPoolExhausted)
    ));

    // Completions recycle the pool.
    assert_eq!(dev.backend_transmit().len(), small_config().tx_buffers);
    ep.write_packet(&route, &mut Prependable::new(14), b"x", 1)
        .unwrap();
}

#[test]
fn failed_write_leaves_the_header_reserve_for_a_retry() {
    let (dev, ep) = endpoint(small_config());
    let route = Route::to(REMOTE);
    for _ in 0..small_config().tx_buffers {
        ep.write_packet(&route, &mut Prependable::new(14), b"x", 1)
            .unwrap();
    }

    let mut hdr = Prependable::new(14 + 4);
    hdr.prepend(4).unwrap().copy_from_slice(b"IPHD");
    let err = ep
        .write_packet(&route, &mut hdr, b"data", EtherType::IPV4)
        .unwrap_err();
    assert!(matches!(
        err,
        LinkError::Device(DeviceError::TxPoolExhausted)
    ));
    assert_eq!(hdr.used_bytes(), b"IPHD");
    assert_eq!(hdr.available(), 14);

    assert_eq!(dev.backend_transmit().len(), small_config().tx_buffers);
    ep.write_packet(&route, &mut hdr, b"data", EtherType::IPV4)
        .unwrap();
    assert_eq!(
        dev.backend_transmit(),
        vec![frame(REMOTE, LOCAL, 0x0800, b"IPHDdata")]
    );
}
