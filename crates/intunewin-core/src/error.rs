use thiserror::Error;

pub type IntunewinResult<T> = Result<T, IntunewinError>;

#[derive(Debug, Error)]
pub enum IntunewinError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
