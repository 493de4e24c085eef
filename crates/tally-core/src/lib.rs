//! Core types and trait definitions for the tally task-ledger pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod ledger;
pub mod meeting;
pub mod message;
pub mod normalize;
pub mod parse;
pub mod roster;
pub mod store;
pub mod transcript;
pub mod window;

pub use error::{Error, Result};
