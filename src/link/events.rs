//! Lifecycle notifications and radio side-effect requests.
//!
//! The state machine never calls out to the rest of the firmware while a
//! transition is being applied.  It records what happened in bounded
//! queues; the composition root drains them once per tick, after the
//! transition step and before inbound dispatch.
//!
//! ```text
//! ┌──────────────┐  LinkEvent     ┌──────────────────┐
//! │  LinkFsm     │──────────────▶│ WearableService  │──▶ LinkListener
//! │  (on_enter)  │  RadioRequest  │ (drains per tick)│──▶ LinkTransport
//! └──────────────┘──────────────▶└──────────────────┘
//! ```

use heapless::Deque;
use log::warn;

/// Pending notifications per tick.  At most two transitions happen in one
/// tick (an external signal plus the timer step), so this never fills up
/// when drained every tick.
const EVENT_QUEUE_CAP: usize = 8;

/// Pending radio requests per tick.
const REQUEST_QUEUE_CAP: usize = 4;

/// Notification emitted at most once per actual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The peer attached and the link is usable.
    Connected,
    /// A connected link was lost (heartbeat timeout or peer detach).
    Disconnected,
    /// A reconnection cycle started.
    Reconnecting,
    /// Reconnection attempts are exhausted; the link is in `Error`.
    Failed,
}

/// Side effect the radio must carry out on behalf of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioRequest {
    StartAdvertising,
    StopAdvertising,
    /// Tear down the peer connection at the radio level.
    DropPeer,
}

/// Bounded FIFO shared by both queue kinds.
pub struct BoundedQueue<T, const N: usize> {
    items: Deque<T, N>,
    dropped: u32,
}

impl<T, const N: usize> BoundedQueue<T, N> {
    pub fn new() -> Self {
        Self {
            items: Deque::new(),
            dropped: 0,
        }
    }

    /// Append an item.  Returns `false` if the queue is full (item dropped).
    pub fn push(&mut self, item: T) -> bool {
        if self.items.push_back(item).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("LINK: queue full, dropping item ({} dropped so far)", self.dropped);
            return false;
        }
        true
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Drain all pending items into a callback, in FIFO order.
    pub fn drain(&mut self, mut handler: impl FnMut(T)) {
        while let Some(item) = self.items.pop_front() {
            handler(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of items lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub type EventQueue = BoundedQueue<LinkEvent, EVENT_QUEUE_CAP>;
pub type RequestQueue = BoundedQueue<RadioRequest, REQUEST_QUEUE_CAP>;
