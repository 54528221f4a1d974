//! # Roomcast Users Crate
//!
//! Everything the chat backend knows about people:
//!
//! - **Identity client**: talks to the remote identity service to validate
//!   session tokens and fetch public profiles.
//! - **User resolver**: an in-memory cache-aside chain in front of the
//!   identity client, used when replaying history.
//! - **Cached account store**: a Redis cache-aside chain in front of the
//!   durable account table.

pub mod entities;
pub mod services;
pub mod types;

pub use entities::UserProfile;
pub use services::{
    AccountOrigin, CachedAccountStore, HttpIdentityClient, IdentityOrigin, IdentityService,
    UserLookup, UserResolver, ACCESS_TOKEN_HEADER,
};
pub use types::{IdentityError, IdentityResult, UserError, UserResult};
