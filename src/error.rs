//! Error taxonomy for the client.
//!
//! Every variant ends up as a dismissible notice; nothing here is retried automatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid phone number or password")]
    BadCredential,
    #[error("no user found with this phone number")]
    UnregisteredIdentity,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("document store unreachable: {0}")]
    Transport(String),
    #[error("document store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected document format: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("media host unreachable: {0}")]
    Transport(String),
    #[error("media host rejected the file: {0}")]
    Rejected(String),
    #[error("media host response had no public URL")]
    MissingUrl,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("this phone number is already registered")]
    DuplicateRegistration,
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing setting `{0}`")]
    MissingSetting(&'static str),
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
#[error("local cache: {0}")]
pub struct StorageError(#[from] pub rusqlite::Error);

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Title and body for a user-facing, dismissible notice.
    pub fn notice(&self) -> (&'static str, String) {
        let title = match self {
            Error::Auth(_) => "Login Failed",
            Error::Validation(ValidationError::DuplicateRegistration) => "Registration Failed",
            Error::Validation(_) => "Missing Information",
            Error::Query(_) => "Network Error",
            Error::Upload(_) => "Upload Failed",
            Error::Config(_) => "Configuration Error",
            Error::Storage(_) => "Cache Error",
        };
        (title, self.to_string())
    }
}
