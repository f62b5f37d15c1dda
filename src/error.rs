use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("secret token is required")]
    MissingToken,

    #[error(
        "file size {size} bytes exceeds maximum limit of {limit_mib} MiB",
        limit_mib = .limit / (1024 * 1024)
    )]
    FileTooLarge { size: u64, limit: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("knowledge base {id} failed processing")]
    KnowledgeBaseFailed { id: String },

    #[error("knowledge base not ready after {attempts} attempts")]
    ReadyTimeout { attempts: u32 },
}
