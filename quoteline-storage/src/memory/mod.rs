//! In-memory store implementations.
//!
//! Used by the test suites and by the engine binary when no external
//! backend is configured. Both stores support failure injection so the
//! retry paths of the background jobs can be exercised deterministically.

mod durable;
mod fast;

pub use durable::{demo_quotes, DurableOp, InMemoryDurableStore, DEMO_QUOTE_BOOK};
pub use fast::InMemoryFastStore;
