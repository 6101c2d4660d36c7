use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeirError {
    #[error("adapter has been disposed")]
    Disposed,

    #[error("commit store error: {0}")]
    Store(String),

    #[error("observer error: {0}")]
    Observer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WeirError>;
