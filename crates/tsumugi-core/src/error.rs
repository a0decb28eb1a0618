use thiserror::Error;

#[derive(Debug, Error)]
pub enum TsumugiError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
