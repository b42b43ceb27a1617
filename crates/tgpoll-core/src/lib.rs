//! Update retrieval and dispatch engine for a long-polling bot API.
//!
//! This crate is transport-agnostic: HTTP lives behind the [`ports::Transport`]
//! port, implemented in an adapter crate.

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod model;
pub mod poller;
pub mod ports;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use bot::Bot;
pub use dispatch::Dispatcher;
pub use errors::{DecodeError, Error, Result};
pub use poller::{BackoffPolicy, PollOutcome, Poller};
pub use registry::{HandlerRegistry, HandlerResult, HandlerSlot};
