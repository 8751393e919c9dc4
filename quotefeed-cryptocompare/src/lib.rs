//! CryptoCompare integration for the Crypto Quote Streaming Terminal
//!
//! Provides the live-fetch path against the CryptoCompare REST API.

pub mod client;

pub use client::CryptoCompareClient;
