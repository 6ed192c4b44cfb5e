//! switchboard-core — wire format, address validation, and configuration.
//! All other Switchboard crates depend on this one.

pub mod config;
pub mod validate;
pub mod wire;

pub use wire::{ClientMessage, ServerMessage};
