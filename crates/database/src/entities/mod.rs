//! Persistent entities

pub mod account;
pub mod chat;

pub use account::Account;
pub use chat::{ChatMessage, NewChatMessage};
