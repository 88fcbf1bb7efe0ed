use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid link entry: {0}")]
    InvalidLink(String),

    #[error("Invalid extended identifier: {0}")]
    ExtendedIdentifier(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
