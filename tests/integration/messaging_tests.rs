//! Integration tests for host messaging through the composition root.
//!
//! Inbound records are injected as transport writes; outbound traffic is
//! read back from the mock's write log and decoded with the real codec.

use crate::mock_link::{Harness, HostCall, MockTransport, RecordingDelay};
use wearable::app::events::DeviceEvent;
use wearable::config::LinkConfig;
use wearable::error::{Error, SendError, TransferError};
use wearable::link::transport::Channel;
use wearable::protocol::{
    Command, ErrorCode, InboundOutcome, MessageBody, MessageKind, Messenger, Status,
};

#[test]
fn recognized_command_reaches_the_handler() {
    let mut h = Harness::new();
    h.connect();
    h.transport()
        .host_writes_json(r#"{"type":"command","id":"app_4","command":"haptic_feedback","data":"double"}"#);
    h.tick_after(10);

    assert_eq!(
        h.handler.calls,
        vec![HostCall::Command(Command::HapticFeedback, "double".into())]
    );
    // No acks unless configured.
    assert!(h.transport().messages_on(Channel::Command).is_empty());
}

#[test]
fn unknown_command_is_ignored_but_unknown_type_is_answered() {
    let mut h = Harness::new();
    h.connect();

    h.transport()
        .host_writes_json(r#"{"type":"command","command":"self_destruct"}"#);
    h.tick_after(10);
    assert!(h.handler.calls.is_empty());
    assert!(h.transport().writes.is_empty());

    h.transport().host_writes_json(r#"{"type":"bogus"}"#);
    h.tick_after(10);
    assert!(h.handler.calls.is_empty());

    let replies = h.transport().messages_on(Channel::Status);
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0].body,
        MessageBody::Error {
            code: ErrorCode::InvalidCommand,
            description: "Invalid message format".into(),
        }
    );
    assert_eq!(h.svc.messenger_stats().messages_rejected, 1);
}

#[test]
fn garbage_bytes_get_an_error_reply() {
    let mut h = Harness::new();
    h.connect();
    h.transport().host_writes(Channel::Status, &[0xFF, 0x00, 0x7B]);
    h.tick_after(10);
    let replies = h.transport().messages_on(Channel::Status);
    assert!(matches!(
        replies.as_slice(),
        [m] if matches!(m.body, MessageBody::Error { code: ErrorCode::InvalidCommand, .. })
    ));
}

#[test]
fn writes_to_notify_only_channels_are_dropped() {
    let mut h = Harness::new();
    h.connect();
    h.transport()
        .host_writes(Channel::Audio, br#"{"type":"command","command":"wake"}"#);
    h.tick_after(10);
    assert!(h.handler.calls.is_empty());
    assert!(h.transport().writes.is_empty());
}

#[test]
fn host_heartbeat_is_echoed_with_gauges() {
    let mut h = Harness::new();
    h.connect();
    h.transport().host_writes_json(r#"{"type":"heartbeat","timestamp":99}"#);
    h.tick_at(3_000);

    let out = h.transport().messages_on(Channel::Status);
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].body,
        MessageBody::Heartbeat {
            uptime_ms: 3_000,
            free_heap: 123_456,
        }
    );
    assert_eq!(out[0].battery, Some(3.9));
    assert!(out[0].id.starts_with("BIL-1B3C5D_"));
}

#[test]
fn peer_status_error_and_ack_are_forwarded() {
    let mut h = Harness::new();
    h.connect();
    h.transport()
        .host_writes_json(r#"{"type":"status","status":"processing","data":"asr"}"#);
    h.transport().host_writes_json(r#"{"type":"error","error_code":7}"#);
    h.transport()
        .host_writes_json(r#"{"type":"ack","ack_id":"BIL-1B3C5D_3"}"#);
    h.tick_after(10);

    assert_eq!(
        h.handler.calls,
        vec![
            HostCall::PeerStatus(Status::Processing, "asr".into()),
            HostCall::PeerError(ErrorCode::Timeout, "Operation timed out".into()),
            HostCall::Ack("BIL-1B3C5D_3".into()),
        ]
    );
}

#[test]
fn commands_are_acked_when_enabled() {
    let mut h = Harness::with_config(LinkConfig {
        ack_commands: true,
        ..Default::default()
    });
    h.connect();
    h.transport()
        .host_writes_json(r#"{"type":"command","id":"app_9","command":"calibrate"}"#);
    h.tick_after(10);

    let acks = h.transport().messages_on(Channel::Command);
    assert_eq!(acks.len(), 1);
    assert_eq!(
        acks[0].body,
        MessageBody::Ack {
            ack_id: "app_9".into()
        }
    );
}

#[test]
fn periodic_heartbeat_and_status_use_strict_intervals() {
    let mut h = Harness::new();
    h.connect();

    // Status every 5 s, heartbeat every 30 s, both measured from 2 500.
    h.tick_at(7_500);
    assert!(h.transport().writes.is_empty());
    h.tick_at(7_501);
    let out = h.transport().messages_on(Channel::Status);
    assert_eq!(out.len(), 1);
    assert!(matches!(
        out[0].body,
        MessageBody::Status {
            status: Status::Ready,
            ..
        }
    ));

    h.transport().clear_writes();
    h.tick_at(32_501);
    let kinds: Vec<_> = h
        .transport()
        .messages_on(Channel::Status)
        .into_iter()
        .map(|m| m.kind())
        .collect();
    assert!(kinds.contains(&MessageKind::Heartbeat));
}

#[test]
fn nothing_is_sent_while_disconnected() {
    let mut h = Harness::new();
    assert_eq!(
        h.svc.send_status(10, Status::Ready, ""),
        Err(Error::Send(SendError::NotConnected))
    );
    h.tick_at(100_000);
    assert!(h.transport().writes.is_empty());
}

#[test]
fn message_ids_increase_per_message() {
    let mut h = Harness::new();
    h.connect();
    h.svc.send_status(3_000, Status::Recording, "").unwrap();
    h.svc
        .send_error(3_001, ErrorCode::LowMemory, "")
        .unwrap();
    let out = h.transport().messages_on(Channel::Status);
    assert_eq!(out[0].id, "BIL-1B3C5D_1");
    assert_eq!(out[1].id, "BIL-1B3C5D_2");
    assert_eq!(
        out[1].body,
        MessageBody::Error {
            code: ErrorCode::LowMemory,
            description: "Insufficient memory available".into(),
        }
    );
}

// ── Chunked audio ─────────────────────────────────────────────

#[test]
fn audio_is_split_into_paced_chunks() {
    let mut h = Harness::new();
    h.connect();
    let payload: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
    let mut delay = RecordingDelay::default();

    let now = h.now;
    h.svc
        .handle_device_event(DeviceEvent::RecordingComplete(payload.clone()), now, &mut delay)
        .unwrap();

    let sizes: Vec<usize> = h.transport().audio_chunks().iter().map(|c| c.len()).collect();
    assert_eq!(sizes, vec![512, 512, 476]);
    let joined: Vec<u8> = h.transport().audio_chunks().concat();
    assert_eq!(joined, payload);
    assert_eq!(delay.pauses_ms, vec![10, 10]);
}

#[test]
fn audio_transfer_aborts_when_the_peer_leaves() {
    let mut h = Harness::new();
    h.connect();
    h.transport().detach_after_audio = Some(2);
    let mut delay = RecordingDelay::default();

    let now = h.now;
    let err = h
        .svc
        .handle_device_event(
            DeviceEvent::RecordingComplete(vec![7; 1500]),
            now,
            &mut delay,
        )
        .unwrap_err();
    assert_eq!(err, Error::Transfer(TransferError::LinkLost { sent: 2 }));
    assert_eq!(h.transport().audio_chunks().len(), 2);
    // The trailing ready status is not sent after an abort.
    assert!(h.transport().messages_on(Channel::Status).is_empty());

    // The state machine learns about the detach on the next tick.
    h.tick_after(10);
    assert!(!h.svc.is_connected());
    assert_eq!(h.svc.messenger_stats().transfers_aborted, 1);
}

#[test]
fn failed_chunk_write_aborts_transfer() {
    let mut h = Harness::new();
    h.connect();
    h.transport().failing_channel = Some(Channel::Audio);
    let now = h.now;
    let err = h
        .svc
        .handle_device_event(
            DeviceEvent::RecordingComplete(vec![1; 600]),
            now,
            &mut RecordingDelay::default(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::Transfer(TransferError::ChunkWriteFailed { sent: 0 })
    );
}

#[test]
fn standalone_messenger_reports_outcomes() {
    let config = LinkConfig::default();
    let mut h = Harness::new();
    h.connect();
    let mut messenger = Messenger::new(&config, "solo");
    let outcome = {
        let link = h.svc.link();
        let mut transport = MockTransport::new();
        messenger.handle_inbound(
            &mut transport,
            link,
            &mut h.handler,
            10,
            1,
            Channel::Status,
            br#"{"type":"command","command":"nope"}"#,
        )
    };
    assert_eq!(outcome, InboundOutcome::IgnoredUnknownCommand);
}
