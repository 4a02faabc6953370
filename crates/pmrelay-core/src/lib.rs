//! Core domain + application logic for the private-message relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait implemented in the adapter crate; the route store is
//! behind `RouteStore`.

pub mod commands;
pub mod config;
pub mod console;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod routing;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
