//! Business logic layer for chat messages and room lookups.

pub mod message_service;
pub mod room_directory;

pub use message_service::{day_window, normalize_message, MessageService};
pub use room_directory::{HttpRoomDirectory, RoomDirectory};
