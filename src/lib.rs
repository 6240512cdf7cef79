//! kvsearch: an in-memory key/value record store with ranked, weighted
//! multi-field search.
//!
//! - [`store`] holds records in insertion order and hands out copies of
//!   cacheable records.
//! - [`search`] normalizes clause queries and scores records against them.
//! - [`http`] exposes both over a small JSON API.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod search;
pub mod store;
