use talk_parser::ParserError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolsError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subscription store: {0}")]
    Store(String),
}

pub type ToolsResult<T> = Result<T, ToolsError>;
