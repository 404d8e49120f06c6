use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaintError {
    #[error("No brushes available for use with this tool")]
    NoBrush,

    #[error("Replace only works in incremental mode")]
    InvalidApplicationMode,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Undo error: {0}")]
    Undo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<PaintError> for String {
    fn from(err: PaintError) -> Self {
        err.to_string()
    }
}
