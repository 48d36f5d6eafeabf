//! paragon-client - HTTP implementation of the search API
//!
//! Blocking facade over a shared async reqwest client, plus the one-time
//! source reference table download.

pub mod client;
pub mod http;
pub mod tables;

pub use client::{source_query, HttpSearchApi};
pub use http::{block_on, http_client};
pub use tables::load_source_table;
