//! Core status types for rpc-callable.
//!
//! This crate provides the status-code taxonomy shared by the call layer
//! (`rpc-callable`) and by transport adapters that report failures to it.
//!
//! ## Modules
//!
//! - `error`: Status codes ([`Code`]) and the portable [`Status`] value

mod error;

pub use error::*;
