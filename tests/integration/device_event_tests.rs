//! Integration tests for application event routing.
//!
//! Each device-side fact must turn into exactly the host traffic (or link
//! action) the mobile app expects.

use crate::mock_link::{Harness, RadioCall, RecordingDelay};
use wearable::app::events::DeviceEvent;
use wearable::error::{Error, SendError};
use wearable::link::transport::Channel;
use wearable::link::{ConnectionState, LinkEvent};
use wearable::protocol::{Command, MessageBody, Status};

fn fire(h: &mut Harness, event: DeviceEvent) -> Result<(), Error> {
    let now = h.now;
    h.svc
        .handle_device_event(event, now, &mut RecordingDelay::default())
}

#[test]
fn wake_word_asks_host_to_start_recording() {
    let mut h = Harness::new();
    h.connect();
    fire(&mut h, DeviceEvent::WakeWordDetected).unwrap();

    let out = h.transport().messages_on(Channel::Command);
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].body,
        MessageBody::Command {
            command: Command::StartRecording,
            data: "wake_word".into(),
        }
    );
}

#[test]
fn recording_complete_ends_with_ready_status() {
    let mut h = Harness::new();
    h.connect();
    fire(&mut h, DeviceEvent::RecordingComplete(vec![3; 100])).unwrap();

    assert_eq!(h.transport().audio_chunks().len(), 1);
    let status = h.transport().messages_on(Channel::Status);
    assert!(matches!(
        status.as_slice(),
        [m] if m.body == MessageBody::Status { status: Status::Ready, data: String::new() }
    ));
    // Audio precedes the status on the wire.
    assert_eq!(h.transport().writes[0].0, Channel::Audio);
}

#[test]
fn gesture_is_reported_as_tagged_ready_status() {
    let mut h = Harness::new();
    h.connect();
    fire(&mut h, DeviceEvent::Gesture("double_tap".into())).unwrap();
    let out = h.transport().messages_on(Channel::Status);
    assert_eq!(
        out[0].body,
        MessageBody::Status {
            status: Status::Ready,
            data: "gesture:double_tap".into(),
        }
    );
}

#[test]
fn low_battery_carries_the_voltage() {
    let mut h = Harness::new();
    h.connect();
    fire(&mut h, DeviceEvent::LowBattery { volts: 3.148 }).unwrap();
    let out = h.transport().messages_on(Channel::Status);
    assert_eq!(
        out[0].body,
        MessageBody::Status {
            status: Status::LowBattery,
            data: "3.15".into(),
        }
    );
}

#[test]
fn events_while_down_are_refused_not_queued() {
    let mut h = Harness::new();
    assert_eq!(
        fire(&mut h, DeviceEvent::Gesture("shake".into())),
        Err(Error::Send(SendError::NotConnected))
    );
    h.connect();
    assert!(h.transport().writes.is_empty());
}

#[test]
fn long_press_toggles_the_link() {
    let mut h = Harness::new();
    h.connect();

    // Connected: long press drops the peer without a disconnect notification.
    fire(&mut h, DeviceEvent::LongPress).unwrap();
    assert_eq!(h.svc.link_state(), ConnectionState::Disconnected);
    assert_eq!(h.transport().radio.last(), Some(&RadioCall::DisconnectPeer));
    h.tick_after(10);
    assert!(h.listener.events.is_empty());

    // Down: long press starts a fresh reconnection cycle.
    fire(&mut h, DeviceEvent::LongPress).unwrap();
    assert_eq!(h.svc.link_state(), ConnectionState::Reconnecting);
    h.tick_after(10);
    assert_eq!(h.listener.events, vec![LinkEvent::Reconnecting]);
    h.tick_after(1_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Advertising);
}

#[test]
fn long_press_recovers_from_error() {
    let mut h = Harness::new();
    let mut now = 0;
    while h.svc.link_state() != ConnectionState::Error && now < 400_000 {
        now += 1_000;
        h.tick_at(now);
    }
    assert_eq!(h.svc.link_state(), ConnectionState::Error);
    h.listener.events.clear();
    h.transport().radio.clear();

    fire(&mut h, DeviceEvent::LongPress).unwrap();
    assert_eq!(h.svc.link_state(), ConnectionState::Reconnecting);
    assert_eq!(h.svc.link_stats(h.now).reconnect_attempts, 0);

    h.tick_after(10);
    assert_eq!(h.listener.events, vec![LinkEvent::Reconnecting]);
    h.tick_after(1_000);
    assert_eq!(h.svc.link_state(), ConnectionState::Advertising);
    assert_eq!(h.transport().radio, vec![RadioCall::StartAdvertising]);

    // The fresh cycle can complete.
    h.transport().attach();
    h.tick_after(100);
    assert_eq!(h.svc.link_state(), ConnectionState::Connected);
}
