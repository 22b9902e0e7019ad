use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZendeskError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

pub type Result<T> = std::result::Result<T, ZendeskError>;
