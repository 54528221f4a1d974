//! Domain entities for user management.

pub mod profile;

pub use profile::UserProfile;
