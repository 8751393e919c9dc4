//! Quote document wire types
//!
//! Mirrors the upstream `pricemultifull` document: for every (from, to)
//! symbol pair a block of raw numeric fields plus a block of
//! display-formatted strings. Missing upstream fields decode to their zero
//! values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Full quote document for a set of symbol pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteDocument {
    /// Raw numeric quote data, keyed by from-symbol then to-symbol.
    #[serde(rename = "RAW", default)]
    pub raw: HashMap<String, HashMap<String, RawQuote>>,
    /// Display-formatted quote data, same keying.
    #[serde(rename = "DISPLAY", default)]
    pub display: HashMap<String, HashMap<String, DisplayQuote>>,
}

/// Raw numeric quote fields for one symbol pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(rename = "PRICE", default)]
    pub price: f64,
    #[serde(rename = "VOLUME24HOUR", default)]
    pub volume_24_hour: f64,
    #[serde(rename = "VOLUME24HOURTO", default)]
    pub volume_24_hour_to: f64,
    #[serde(rename = "OPEN24HOUR", default)]
    pub open_24_hour: f64,
    #[serde(rename = "HIGH24HOUR", default)]
    pub high_24_hour: f64,
    #[serde(rename = "LOW24HOUR", default)]
    pub low_24_hour: f64,
    #[serde(rename = "CHANGE24HOUR", default)]
    pub change_24_hour: f64,
    #[serde(rename = "CHANGEPCT24HOUR", default)]
    pub change_pct_24_hour: f64,
    #[serde(rename = "SUPPLY", default)]
    pub supply: f64,
    #[serde(rename = "MKTCAP", default)]
    pub mktcap: f64,
}

/// Display-formatted quote fields for one symbol pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayQuote {
    #[serde(rename = "PRICE", default)]
    pub price: String,
    #[serde(rename = "VOLUME24HOUR", default)]
    pub volume_24_hour: String,
    #[serde(rename = "VOLUME24HOURTO", default)]
    pub volume_24_hour_to: String,
    #[serde(rename = "OPEN24HOUR", default)]
    pub open_24_hour: String,
    #[serde(rename = "HIGH24HOUR", default)]
    pub high_24_hour: String,
    #[serde(rename = "LOW24HOUR", default)]
    pub low_24_hour: String,
    #[serde(rename = "CHANGE24HOUR", default)]
    pub change_24_hour: String,
    #[serde(rename = "CHANGEPCT24HOUR", default)]
    pub change_pct_24_hour: String,
    #[serde(rename = "SUPPLY", default)]
    pub supply: String,
    #[serde(rename = "MKTCAP", default)]
    pub mktcap: String,
}
