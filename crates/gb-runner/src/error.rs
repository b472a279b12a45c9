use gb_backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, RunError>;
