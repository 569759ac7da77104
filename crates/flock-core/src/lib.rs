//! Core types and trait definitions for the Flock roster service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod checkin;
pub mod error;
pub mod event;
pub mod family;
pub mod import;
pub mod intake;
pub mod ministry;
pub mod person;
pub mod report;
pub mod store;

pub use error::{Error, Result};
