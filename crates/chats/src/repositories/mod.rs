//! Data access contracts used by the chat system.

pub mod chat_store;

pub use chat_store::ChatStore;
