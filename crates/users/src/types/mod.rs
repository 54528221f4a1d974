pub mod errors;

pub use errors::{IdentityError, IdentityResult, UserError, UserResult};
