//! Repositories over the sqlite pool

pub mod account_repository;
pub mod chat_repository;

pub use account_repository::AccountRepository;
pub use chat_repository::ChatRepository;
