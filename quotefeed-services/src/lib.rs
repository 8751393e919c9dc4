//! Business logic services for the Crypto Quote Streaming Terminal
//!
//! This crate provides the subscriber fan-out plumbing (mailboxes and the
//! connection registry) and the price manager that feeds it through the
//! cache -> live fetch -> persisted fallback resolution chain.

pub mod hub;
pub mod mailbox;
pub mod price_manager;
pub mod price_store;

pub use hub::Hub;
pub use mailbox::{CloseReason, Delivery, Mailbox, MailboxId, MailboxReceiver};
pub use price_manager::{BroadcastEnd, PriceManager, PriceManagerConfig};
pub use price_store::{PriceStore, PriceStoreError};
