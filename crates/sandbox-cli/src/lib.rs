//! Sandbox CLI library - the gateway HTTP client and command implementations.
//!
//! The binary (`sandbox`) is a thin wrapper around this crate.

pub mod client;
pub mod commands;

pub use client::GatewayClient;
