//! # Strand
//!
//! The Strand binary crate: a CLI and an HTTP API over a
//! [`strand_core::GraphEngine`] backed by a JSON-lines event log.
//!
//! The library target exists so integration tests can build the router and
//! the log directly.

pub mod api;
pub mod cli;
pub mod config;
pub mod store;
