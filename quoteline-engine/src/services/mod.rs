//! Service Layer
//!
//! Business logic sitting between request glue and the engine internals:
//! price fixing, status-transition checks, and cache-backed reads.

mod trading_service;

pub use trading_service::*;
