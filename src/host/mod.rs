//! Host-facing boundary: request gateway, envelopes, and the stdio bridge.

pub mod channel;
pub mod contract;
pub mod gateway;
pub mod shell;
pub mod stdio;
