//! Tamper evidence for the audit trail.

pub mod error;
pub mod signer;

pub use error::SigningError;
pub use signer::Signer;

pub const SIGNATURE_ALGORITHM: &str = "HMAC-SHA256";
