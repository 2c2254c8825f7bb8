mod context;
mod error;
mod extractor;
mod role;

pub use context::AccountContext;
pub use error::AuthError;
pub use extractor::{bearer_token, TokenClaims, TokenVerifier};
pub use role::Role;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
