//! Connection registry
//!
//! Single owner of the set of active subscriber mailboxes. Every mutation
//! goes through one command loop, so the set is never touched from two
//! tasks at once and no locking is involved.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::mailbox::{CloseReason, Mailbox, MailboxId};

#[derive(Debug)]
enum HubCommand {
    Register(Mailbox),
    Unregister(Mailbox),
    Contains(MailboxId, oneshot::Sender<bool>),
    Len(oneshot::Sender<usize>),
}

/// Handle to the registry command loop
#[derive(Debug, Clone)]
pub struct Hub {
    tx: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Spawn the registry loop. It runs for the life of the process.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run(rx));
        Self { tx }
    }

    /// Admit a mailbox to the active set.
    pub async fn register(&self, mailbox: Mailbox) {
        self.send(HubCommand::Register(mailbox)).await;
    }

    /// Remove a mailbox from the active set and close it.
    ///
    /// Removing an unknown or already-removed mailbox is a no-op.
    pub async fn unregister(&self, mailbox: Mailbox) {
        self.send(HubCommand::Unregister(mailbox)).await;
    }

    /// Whether a mailbox is currently registered.
    pub async fn contains(&self, id: MailboxId) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Contains(id, reply_tx)).await;
        reply_rx.await.unwrap_or(false)
    }

    /// Number of active subscribers.
    pub async fn len(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Len(reply_tx)).await;
        reply_rx.await.unwrap_or(0)
    }

    async fn send(&self, command: HubCommand) {
        if self.tx.send(command).await.is_err() {
            warn!("Registry loop is gone; command dropped");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(mut rx: mpsc::Receiver<HubCommand>) {
    let mut clients: HashMap<MailboxId, Mailbox> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            HubCommand::Register(mailbox) => {
                debug!("Registered {}", mailbox.id());
                clients.insert(mailbox.id(), mailbox);
            }
            HubCommand::Unregister(mailbox) => {
                if let Some(existing) = clients.remove(&mailbox.id()) {
                    existing.close(CloseReason::Normal);
                    info!("Unregistered {}", mailbox.id());
                }
            }
            HubCommand::Contains(id, reply) => {
                let _ = reply.send(clients.contains_key(&id));
            }
            HubCommand::Len(reply) => {
                let _ = reply.send(clients.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{self, Delivery};
    use bytes::Bytes;

    #[tokio::test]
    async fn register_then_unregister() {
        let hub = Hub::new();
        let (mailbox, _rx) = mailbox::channel(8);
        let id = mailbox.id();

        hub.register(mailbox.clone()).await;
        assert!(hub.contains(id).await);
        assert_eq!(hub.len().await, 1);

        hub.unregister(mailbox).await;
        assert!(!hub.contains(id).await);
        assert_eq!(hub.len().await, 0);
    }

    #[tokio::test]
    async fn unregister_closes_the_mailbox() {
        let hub = Hub::new();
        let (mailbox, mut rx) = mailbox::channel(8);

        hub.register(mailbox.clone()).await;
        hub.unregister(mailbox.clone()).await;

        assert_eq!(
            mailbox.send(Bytes::from_static(b"late")).await,
            Delivery::RecipientClosed
        );
        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.close_reason(), CloseReason::Normal);
    }

    #[tokio::test]
    async fn double_unregister_is_a_noop() {
        let hub = Hub::new();
        let (mailbox, mut rx) = mailbox::channel(8);

        hub.register(mailbox.clone()).await;
        hub.unregister(mailbox.clone()).await;
        hub.unregister(mailbox.clone()).await;

        assert!(!hub.contains(mailbox.id()).await);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn unregister_unknown_mailbox_is_a_noop() {
        let hub = Hub::new();
        let (mailbox, _rx) = mailbox::channel(8);

        hub.unregister(mailbox.clone()).await;

        assert!(!hub.contains(mailbox.id()).await);
        // Never admitted, so the registry must not have closed it.
        assert!(!mailbox.is_closed());
    }

    #[tokio::test]
    async fn unregister_preserves_an_earlier_close_reason() {
        let hub = Hub::new();
        let (mailbox, mut rx) = mailbox::channel(8);

        hub.register(mailbox.clone()).await;
        mailbox.close(CloseReason::Unavailable);
        hub.unregister(mailbox).await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.close_reason(), CloseReason::Unavailable);
    }
}
