use thiserror::Error;

/// Errors returned by galleries, outputs and template formats.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery: {0}")]
    Io(String),

    #[error("gallery: invalid format: {0}")]
    InvalidFormat(String),

    #[error("gallery: no {kind} handler for {name:?}")]
    Unsupported { kind: &'static str, name: String },

    #[error("gallery: {0:?} is read-only")]
    ReadOnly(String),

    #[error("gallery: {0:?} not found")]
    NotFound(String),

    #[error("gallery: cell ({row}, {col}) outside {rows}x{cols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("gallery: cannot {op} {left_rows}x{left_cols} with {right_rows}x{right_cols}")]
    ShapeMismatch {
        op: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("gallery: output written before initialize")]
    Uninitialized,
}

impl From<std::io::Error> for GalleryError {
    fn from(e: std::io::Error) -> Self {
        GalleryError::Io(e.to_string())
    }
}
