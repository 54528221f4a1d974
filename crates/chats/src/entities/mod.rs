//! Wire entities exchanged with connected clients.

pub mod payload;

pub use payload::{ChatPayload, HistoryBatch};
