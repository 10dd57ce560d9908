//! Messaging core: outbound sends, inbound dispatch, heartbeat emission and
//! chunked audio.
//!
//! The messenger reads link status through [`LinkStatus`] and never mutates
//! it.  Every send is gated on `Connected`; "link down" comes back as
//! [`SendError::NotConnected`], an expected and frequent value rather than
//! a fault.
//!
//! Channel routing:
//!
//! | Outbound             | Channel   |
//! |----------------------|-----------|
//! | command, ack         | `Command` |
//! | status, heartbeat, error | `Status` |
//! | audio chunks         | `Audio`   |
//!
//! Inbound host messages arrive on the `Status` channel only.

extern crate alloc;
use alloc::string::String;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::chunked::AudioTransfer;
use super::codec;
use super::message::{Command, ErrorCode, Message, MessageBody, MessageIdGen, MessageKind, Status};
use crate::app::ports::CommandHandler;
use crate::config::LinkConfig;
use crate::error::{DecodeError, SendError, TransferError};
use crate::link::LinkStatus;
use crate::link::transport::{Channel, LinkTransport};

/// Description sent back when a host record cannot be decoded.
pub const INVALID_FORMAT_DESCRIPTION: &str = "Invalid message format";

/// What became of one inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Decoded and routed to the handler.
    Dispatched(MessageKind),
    /// A host heartbeat, answered with our own.
    HeartbeatEchoed,
    /// A well-formed command outside the vocabulary; dropped quietly.
    IgnoredUnknownCommand,
    /// Decoded, but nothing on the device consumes this kind.
    Unhandled(MessageKind),
    /// Undecodable; an error message was sent back (if the link allowed).
    Rejected(DecodeError),
    /// Bytes arrived on a channel the host must not write to.
    WrongChannel,
}

/// Running counters, reset only at boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessengerStats {
    pub messages_sent: u32,
    pub sends_refused: u32,
    pub messages_received: u32,
    pub messages_rejected: u32,
    pub chunks_sent: u32,
    pub transfers_completed: u32,
    pub transfers_aborted: u32,
}

pub struct Messenger {
    ids: MessageIdGen,
    chunk_size: usize,
    chunk_pacing_ms: u32,
    status_interval_ms: u32,
    ack_commands: bool,
    battery_volts: Option<f32>,
    last_heartbeat_ms: u64,
    last_status_ms: u64,
    stats: MessengerStats,
}

impl Messenger {
    pub fn new(config: &LinkConfig, id_prefix: impl Into<String>) -> Self {
        Self {
            ids: MessageIdGen::new(id_prefix),
            chunk_size: usize::from(config.audio_chunk_size),
            chunk_pacing_ms: config.chunk_pacing_ms,
            status_interval_ms: config.status_interval_ms,
            ack_commands: config.ack_commands,
            battery_volts: None,
            last_heartbeat_ms: 0,
            last_status_ms: 0,
            stats: MessengerStats::default(),
        }
    }

    /// Restart the periodic timers when the link comes up.
    pub fn on_link_up(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
        self.last_status_ms = now_ms;
    }

    /// Battery voltage stamped on subsequent messages.
    pub fn set_battery(&mut self, volts: Option<f32>) {
        self.battery_volts = volts;
    }

    pub fn stats(&self) -> MessengerStats {
        self.stats
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    pub fn send_command<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        command: Command,
        data: &str,
    ) -> Result<(), SendError> {
        let body = MessageBody::Command {
            command,
            data: data.into(),
        };
        self.send(transport, link, Channel::Command, now_ms, body)
    }

    pub fn send_status<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        status: Status,
        data: &str,
    ) -> Result<(), SendError> {
        let body = MessageBody::Status {
            status,
            data: data.into(),
        };
        self.send(transport, link, Channel::Status, now_ms, body)
    }

    /// An empty `description` is replaced by the code's default text.
    pub fn send_error<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        code: ErrorCode,
        description: &str,
    ) -> Result<(), SendError> {
        let description = if description.is_empty() {
            code.default_description()
        } else {
            description
        };
        let body = MessageBody::Error {
            code,
            description: description.into(),
        };
        self.send(transport, link, Channel::Status, now_ms, body)
    }

    pub fn send_heartbeat<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        free_heap: u32,
    ) -> Result<(), SendError> {
        let body = MessageBody::Heartbeat {
            uptime_ms: now_ms,
            free_heap,
        };
        self.send(transport, link, Channel::Status, now_ms, body)
    }

    pub fn send_ack<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        ack_id: &str,
    ) -> Result<(), SendError> {
        let body = MessageBody::Ack {
            ack_id: ack_id.into(),
        };
        self.send(transport, link, Channel::Command, now_ms, body)
    }

    fn send<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        channel: Channel,
        now_ms: u64,
        body: MessageBody,
    ) -> Result<(), SendError> {
        if !link.is_connected() {
            self.stats.sends_refused = self.stats.sends_refused.wrapping_add(1);
            return Err(SendError::NotConnected);
        }
        if !transport.has_channel(channel) {
            self.stats.sends_refused = self.stats.sends_refused.wrapping_add(1);
            return Err(SendError::ChannelUnavailable);
        }

        let kind = body.kind();
        let msg = Message {
            id: self.ids.next_id(),
            timestamp: now_ms,
            battery: self.battery_volts,
            body,
        };
        let bytes = codec::encode(&msg);

        transport.send(channel, &bytes).map_err(|e| {
            warn!("MSG: {} write on {} failed: {:?}", kind.as_str(), channel.as_str(), e);
            self.stats.sends_refused = self.stats.sends_refused.wrapping_add(1);
            SendError::WriteFailed
        })?;

        debug!("MSG: sent {} {} ({} B)", kind.as_str(), msg.id, bytes.len());
        self.stats.messages_sent = self.stats.messages_sent.wrapping_add(1);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chunked audio
    // -----------------------------------------------------------------------

    /// Send `payload` as paced chunks on the audio channel.
    ///
    /// The link is re-checked before every chunk; the transfer aborts the
    /// moment it is no longer `Connected` or a write fails.  Nothing is
    /// retried.  Returns the number of chunks written.
    pub fn send_audio<T: LinkTransport, D: DelayNs>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        delay: &mut D,
        payload: &[u8],
    ) -> Result<usize, TransferError> {
        if !link.is_connected() || !transport.has_channel(Channel::Audio) {
            return Err(TransferError::NotConnected);
        }

        let mut transfer = AudioTransfer::new(payload, self.chunk_size);
        info!(
            "MSG: audio transfer {} B in {} chunks",
            transfer.payload_len(),
            transfer.total_chunks()
        );

        while let Some(chunk) = transfer.peek() {
            let sent = transfer.sent_chunks();
            if sent > 0 {
                delay.delay_ms(self.chunk_pacing_ms);
            }

            if !link.is_connected() || !transport.is_peer_attached() {
                warn!("MSG: link lost after {sent} chunks, audio transfer aborted");
                self.stats.transfers_aborted = self.stats.transfers_aborted.wrapping_add(1);
                return Err(TransferError::LinkLost { sent });
            }

            if let Err(e) = transport.send(Channel::Audio, chunk) {
                warn!("MSG: audio chunk {sent} write failed: {e:?}, transfer aborted");
                self.stats.transfers_aborted = self.stats.transfers_aborted.wrapping_add(1);
                return Err(TransferError::ChunkWriteFailed { sent });
            }

            transfer.advance();
            self.stats.chunks_sent = self.stats.chunks_sent.wrapping_add(1);
        }

        self.stats.transfers_completed = self.stats.transfers_completed.wrapping_add(1);
        Ok(transfer.sent_chunks())
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Decode and route one inbound record.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_inbound<T: LinkTransport, H: CommandHandler>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        handler: &mut H,
        now_ms: u64,
        free_heap: u32,
        channel: Channel,
        bytes: &[u8],
    ) -> InboundOutcome {
        if channel != Channel::Status {
            debug!("MSG: dropped {} B written to {} channel", bytes.len(), channel.as_str());
            return InboundOutcome::WrongChannel;
        }
        self.stats.messages_received = self.stats.messages_received.wrapping_add(1);

        let msg = match codec::decode(bytes) {
            Ok(msg) => msg,
            Err(DecodeError::UnknownCommand) => {
                debug!("MSG: unknown host command ignored");
                return InboundOutcome::IgnoredUnknownCommand;
            }
            Err(e) => {
                warn!("MSG: rejected host message ({e}), {} B", bytes.len());
                self.stats.messages_rejected = self.stats.messages_rejected.wrapping_add(1);
                if let Err(send_err) = self.send_error(
                    transport,
                    link,
                    now_ms,
                    ErrorCode::InvalidCommand,
                    INVALID_FORMAT_DESCRIPTION,
                ) {
                    debug!("MSG: error reply not sent: {send_err}");
                }
                return InboundOutcome::Rejected(e);
            }
        };

        let kind = msg.kind();
        match msg.body {
            MessageBody::Command { command, data } => {
                handler.on_command(command, &data);
                if self.ack_commands && !msg.id.is_empty() {
                    if let Err(e) = self.send_ack(transport, link, now_ms, &msg.id) {
                        debug!("MSG: ack for {} not sent: {e}", msg.id);
                    }
                }
                InboundOutcome::Dispatched(kind)
            }
            MessageBody::Status { status, data } => {
                handler.on_peer_status(status, &data);
                InboundOutcome::Dispatched(kind)
            }
            MessageBody::Error { code, description } => {
                handler.on_peer_error(code, &description);
                InboundOutcome::Dispatched(kind)
            }
            MessageBody::Ack { ack_id } => {
                handler.on_ack(&ack_id);
                InboundOutcome::Dispatched(kind)
            }
            MessageBody::Heartbeat { .. } => {
                if let Err(e) = self.send_heartbeat(transport, link, now_ms, free_heap) {
                    debug!("MSG: heartbeat echo not sent: {e}");
                }
                InboundOutcome::HeartbeatEchoed
            }
            MessageBody::AudioData { data } => {
                debug!("MSG: host audio_data ({} B) has no consumer", data.len());
                InboundOutcome::Unhandled(kind)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Periodic emission
    // -----------------------------------------------------------------------

    /// Emit a heartbeat once more than the heartbeat interval has passed
    /// since the last one.  Independent of the echo path.
    pub fn poll_heartbeat<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        free_heap: u32,
    ) -> bool {
        if !link.is_connected() {
            return false;
        }
        if now_ms.saturating_sub(self.last_heartbeat_ms) <= u64::from(link.heartbeat_interval_ms()) {
            return false;
        }
        self.last_heartbeat_ms = now_ms;
        self.send_heartbeat(transport, link, now_ms, free_heap).is_ok()
    }

    /// Emit `status` once more than the status interval has passed since the
    /// last periodic report.
    pub fn poll_status<T: LinkTransport>(
        &mut self,
        transport: &mut T,
        link: &impl LinkStatus,
        now_ms: u64,
        status: Status,
    ) -> bool {
        if !link.is_connected() {
            return false;
        }
        if now_ms.saturating_sub(self.last_status_ms) <= u64::from(self.status_interval_ms) {
            return false;
        }
        self.last_status_ms = now_ms;
        self.send_status(transport, link, now_ms, status, "").is_ok()
    }
}
