// src/lib.rs

//! cptrack: competitive-programming account tracker.
//!
//! Fetches profiles, rating histories and archive news from several
//! platforms, parses them into common records and keeps them in a typed,
//! durable item store.

pub mod error;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
