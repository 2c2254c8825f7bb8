use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Authorization header is not a bearer token")]
    MalformedAuthHeader,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("Account {0} is not registered")]
    UnknownAccount(String),

    #[error("Account {0} is deactivated")]
    AccountDeactivated(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}
