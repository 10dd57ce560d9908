//! Integration tests for the transport → state machine → listener path.
//!
//! Drives the composition root with a mock radio and checks both the
//! lifecycle notifications and the radio side effects they cause.

use crate::mock_link::{Harness, RadioCall};
use wearable::config::LinkConfig;
use wearable::link::{ConnectionState, LinkEvent};

#[test]
fn boot_advertises_after_first_backoff() {
    let mut h = Harness::new();
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);

    h.tick_at(999);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);

    h.tick_at(1_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Reconnecting);
    assert_eq!(h.listener.events, vec![LinkEvent::Reconnecting]);

    h.tick_at(2_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Advertising);
    assert_eq!(h.transport().radio, vec![RadioCall::StartAdvertising]);
    assert_eq!(h.svc.link_stats(2_000).reconnect_attempts, 1);
}

#[test]
fn attach_connects_and_stops_advertising() {
    let mut h = Harness::new();
    h.tick_at(1_000);
    h.tick_at(2_000);
    h.transport().attach();
    h.tick_at(2_500);

    assert!(h.svc.is_connected());
    assert_eq!(
        h.transport().radio,
        vec![RadioCall::StartAdvertising, RadioCall::StopAdvertising]
    );
    assert_eq!(
        h.listener.events,
        vec![LinkEvent::Reconnecting, LinkEvent::Connected]
    );
    let stats = h.svc.link_stats(4_500);
    assert_eq!(stats.reconnect_attempts, 0);
    assert_eq!(stats.connected_since_ms, Some(2_500));
    assert_eq!(stats.connection_duration_ms, 2_000);
}

#[test]
fn handshake_moves_advertising_to_connecting() {
    let mut h = Harness::new();
    h.tick_at(1_000);
    h.tick_at(2_000);
    h.transport().handshake();
    h.tick_at(2_100);
    assert_eq!(h.svc.link_state(), ConnectionState::Connecting);

    h.transport().attach();
    h.tick_at(2_200);
    assert!(h.svc.is_connected());
}

#[test]
fn silent_peer_is_dropped_after_heartbeat_timeout() {
    let mut h = Harness::new();
    h.connect();

    // Exactly at the timeout the link survives.
    h.tick_at(2_500 + 60_000);
    assert!(h.svc.is_connected());

    h.tick_at(2_500 + 60_001);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(h.listener.events, vec![LinkEvent::Disconnected]);
    assert_eq!(h.transport().radio.last(), Some(&RadioCall::DisconnectPeer));

    // The radio's own detach report arrives late and changes nothing.
    h.tick_after(10);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(h.listener.events, vec![LinkEvent::Disconnected]);
}

#[test]
fn host_traffic_keeps_the_link_alive() {
    let mut h = Harness::new();
    h.connect();

    h.transport().host_writes_json(r#"{"type":"heartbeat"}"#);
    h.tick_at(40_000);
    h.tick_at(62_600);
    assert!(h.svc.is_connected());

    h.tick_at(100_001);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
}

#[test]
fn peer_detach_notifies_and_reconnects_later() {
    let mut h = Harness::new();
    h.connect();

    h.transport().detach();
    h.tick_at(5_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(h.listener.events, vec![LinkEvent::Disconnected]);
    // A peer that left on its own is not dropped again.
    assert!(!h.transport().radio.contains(&RadioCall::DisconnectPeer));

    // Backoff was reset by the successful connection.
    h.tick_at(6_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Reconnecting);
}

#[test]
fn exhausted_attempts_end_in_sticky_error() {
    let mut h = Harness::new();
    let mut now = 0;
    for _ in 0..400 {
        now += 1_000;
        h.tick_at(now);
        if h.svc.link_state() == ConnectionState::Error {
            break;
        }
    }
    assert_eq!(h.svc.link_state(), ConnectionState::Error);
    assert_eq!(h.svc.link_stats(now).reconnect_attempts, 10);

    let failed = h
        .listener
        .events
        .iter()
        .filter(|e| **e == LinkEvent::Failed)
        .count();
    assert_eq!(failed, 1);
    assert_eq!(h.listener.events.last(), Some(&LinkEvent::Failed));
    let advertised = h
        .transport()
        .radio
        .iter()
        .filter(|c| **c == RadioCall::StartAdvertising)
        .count();
    assert_eq!(advertised, 10);

    // Nothing but a reset leaves Error.
    h.transport().attach();
    h.tick_after(1_000);
    h.tick_after(60_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Error);

    h.svc.reset_link(h.now);
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(h.svc.link_stats(h.now).reconnect_attempts, 0);
}

#[test]
fn backoff_doubles_up_to_the_cap() {
    let config = LinkConfig {
        reconnect_initial_interval_ms: 1_000,
        reconnect_max_interval_ms: 4_000,
        connection_attempt_timeout_ms: 500,
        ..Default::default()
    };
    let mut h = Harness::with_config(config);
    let mut seen = Vec::new();
    let mut now = 0;
    for _ in 0..100 {
        now += 100;
        h.tick_at(now);
        let interval = h.svc.link_stats(now).backoff_interval_ms;
        if seen.last() != Some(&interval) {
            seen.push(interval);
        }
    }
    assert_eq!(seen, vec![1_000, 2_000, 4_000]);
}
