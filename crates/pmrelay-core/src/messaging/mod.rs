//! Messenger abstractions: the inbound event model and the outbound port.

pub mod port;
pub mod types;
