use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Action error: {0}")]
    Action(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Tool-use budget exceeded after {0} model round-trips")]
    ToolBudget(u32),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
