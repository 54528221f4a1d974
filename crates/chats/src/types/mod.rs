pub mod errors;

pub use errors::{BusError, BusResult, ChatError, ChatResult};
