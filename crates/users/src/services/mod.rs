//! Business logic layer for identity and account lookups.

pub mod account_store;
pub mod identity_client;
pub mod user_resolver;

pub use account_store::{AccountOrigin, CachedAccountStore};
pub use identity_client::{HttpIdentityClient, IdentityService, ACCESS_TOKEN_HEADER};
pub use user_resolver::{IdentityOrigin, UserLookup, UserResolver};
