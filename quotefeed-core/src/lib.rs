//! Core types for the Crypto Quote Streaming Terminal
//!
//! This crate defines the shared data structures used across the terminal:
//! price queries and their cache keys, the quote document wire types, the
//! upstream source abstraction and the error taxonomy.

pub mod error;
pub mod query;
pub mod quote;
pub mod source;

pub use error::{FeedError, FeedResult};
pub use query::{CacheKey, PriceQuery};
pub use quote::{DisplayQuote, QuoteDocument, RawQuote};
pub use source::QuoteSource;
