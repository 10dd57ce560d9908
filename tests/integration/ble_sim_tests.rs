//! End-to-end tests against the simulated BLE GATT transport.

use crate::mock_link::{FixedGauges, RecordingHandler, RecordingListener};
use wearable::adapters::ble_transport::BleLinkTransport;
use wearable::adapters::device_id::DeviceIdentity;
use wearable::app::service::WearableService;
use wearable::config::LinkConfig;
use wearable::link::transport::Channel;
use wearable::link::{ConnectionState, LinkEvent};
use wearable::protocol::{decode, MessageBody};

fn make_service() -> WearableService<BleLinkTransport> {
    let identity = DeviceIdentity::detect();
    let mut transport = BleLinkTransport::new(identity.ble_name());
    transport.init().unwrap();
    let mut svc = WearableService::new(
        &LinkConfig::default(),
        identity.id(),
        transport,
    );
    svc.start(0);
    svc
}

#[test]
fn full_session_over_simulated_radio() {
    let mut svc = make_service();
    let mut handler = RecordingHandler::default();
    let mut listener = RecordingListener::default();
    let gauges = FixedGauges::default();

    svc.tick(1_000, &mut handler, &mut listener, &gauges);
    svc.tick(2_000, &mut handler, &mut listener, &gauges);
    assert!(svc.transport().is_advertising());

    svc.transport_mut().simulate_peer_attached();
    svc.tick(2_100, &mut handler, &mut listener, &gauges);
    assert_eq!(svc.link_state(), ConnectionState::Connected);
    assert!(!svc.transport().is_advertising());

    svc.transport_mut()
        .simulate_write(Channel::Status, br#"{"type":"heartbeat"}"#);
    svc.tick(2_200, &mut handler, &mut listener, &gauges);

    let sent = svc.transport_mut().take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Channel::Status);
    let echo = decode(&sent[0].1).unwrap();
    assert!(matches!(echo.body, MessageBody::Heartbeat { .. }));
    assert!(echo.id.starts_with("BIL-1B3C5D_"));

    svc.transport_mut().simulate_peer_detached();
    svc.tick(2_300, &mut handler, &mut listener, &gauges);
    assert_eq!(svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(
        listener.events,
        vec![
            LinkEvent::Reconnecting,
            LinkEvent::Connected,
            LinkEvent::Disconnected
        ]
    );
}
