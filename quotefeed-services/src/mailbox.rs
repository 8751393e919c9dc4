//! Per-subscriber mailboxes
//!
//! A mailbox decouples quote production from transport delivery. It is
//! exclusively owned by one subscriber connection, closed exactly once, and
//! delivery onto a closed mailbox is an outcome, never a fault.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Unique identifier for a subscriber mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailboxId(pub u64);

impl std::fmt::Display for MailboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mailbox-{}", self.0)
    }
}

/// Why a mailbox was closed; carried to the peer in the close frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Ordinary teardown: the subscriber left or the registry removed it.
    Normal,
    /// Every link of the resolution chain failed for this subscription.
    Unavailable,
}

/// Outcome of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    RecipientClosed,
}

#[derive(Debug)]
enum Frame {
    Payload(Bytes),
    Close(CloseReason),
}

static NEXT_MAILBOX_ID: AtomicU64 = AtomicU64::new(1);

/// Create a mailbox pair with the given queue capacity
pub fn channel(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let mailbox = Mailbox {
        id: MailboxId(NEXT_MAILBOX_ID.fetch_add(1, Ordering::SeqCst)),
        tx,
        closed: Arc::new(AtomicBool::new(false)),
    };
    let receiver = MailboxReceiver {
        rx,
        close_reason: None,
        drained: false,
    };
    (mailbox, receiver)
}

/// Sending half of a mailbox, held by the registry and the broadcast task
#[derive(Debug, Clone)]
pub struct Mailbox {
    id: MailboxId,
    tx: mpsc::Sender<Frame>,
    closed: Arc<AtomicBool>,
}

impl Mailbox {
    pub fn id(&self) -> MailboxId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver a payload to the subscriber's queue.
    ///
    /// A closed mailbox is reported as `RecipientClosed`; it is never an
    /// error.
    pub async fn send(&self, payload: Bytes) -> Delivery {
        if self.is_closed() {
            return Delivery::RecipientClosed;
        }
        match self.tx.send(Frame::Payload(payload)).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::RecipientClosed,
        }
    }

    /// Close the mailbox. The first call wins; later calls are no-ops.
    pub fn close(&self, reason: CloseReason) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Best effort: if the queue is full the receiver still observes
        // closure once every sender handle is dropped.
        let _ = self.tx.try_send(Frame::Close(reason));
    }
}

/// Receiving half of a mailbox, owned by the outbound transport pump
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Frame>,
    close_reason: Option<CloseReason>,
    drained: bool,
}

impl MailboxReceiver {
    /// Next payload, or `None` once the mailbox is closed.
    pub async fn recv(&mut self) -> Option<Bytes> {
        if self.drained {
            return None;
        }
        match self.rx.recv().await {
            Some(Frame::Payload(payload)) => Some(payload),
            Some(Frame::Close(reason)) => {
                self.drained = true;
                self.close_reason = Some(reason);
                None
            }
            None => {
                self.drained = true;
                None
            }
        }
    }

    /// Already-queued payload, if any; lets the pump coalesce writes.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        if self.drained {
            return None;
        }
        match self.rx.try_recv() {
            Ok(Frame::Payload(payload)) => Some(payload),
            Ok(Frame::Close(reason)) => {
                self.drained = true;
                self.close_reason = Some(reason);
                None
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.drained = true;
                None
            }
        }
    }

    /// The close reason, meaningful once `recv` has returned `None`.
    pub fn close_reason(&self) -> CloseReason {
        self.close_reason.unwrap_or(CloseReason::Normal)
    }
}
