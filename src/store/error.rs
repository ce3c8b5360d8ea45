use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("token store: not started")]
    NotStarted,
    #[error("token store: stopped")]
    Stopped,
    #[error("token store: start requires a running tokio runtime")]
    NoRuntime,
    #[error("token store: invalid settings: {0}")]
    InvalidSettings(String),
}
