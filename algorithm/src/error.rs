use biomatch_gallery::GalleryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlgorithmError {
    #[error("algorithm: no algorithm set and no default algorithm configured")]
    MissingDescriptor,

    #[error("algorithm: invalid descriptor {0:?}, expected feature[:distance]")]
    InvalidDescriptorFormat(String),

    #[error("algorithm: no {kind} named {expr:?}")]
    UnresolvedStage { kind: &'static str, expr: String },

    #[error("algorithm: {algorithm:?} has no {stage} stage")]
    MissingStage {
        algorithm: String,
        stage: &'static str,
    },

    #[error("algorithm: {0:?} requested itself during construction")]
    RecursiveDescriptor(String),

    #[error("algorithm: null gallery {0:?}")]
    NullGallery(String),

    #[error("algorithm: null output {0:?}")]
    NullOutput(String),

    #[error("algorithm: matrix is {rows}x{cols}, file lists are {queries}x{targets}")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        queries: usize,
        targets: usize,
    },

    #[error("algorithm: split output {0:?} lacks the %1 placeholder")]
    MissingSplitPlaceholder(String),

    #[error("algorithm: split sizes {sizes:?} do not sum to {total}")]
    InvalidSplit { sizes: Vec<usize>, total: usize },

    #[error("algorithm: unsupported catType {0:?}, expected colWise or rowWise")]
    UnsupportedMergeType(String),

    #[error("algorithm: cannot merge {0:?}, its shared file list differs")]
    IncompatibleMerge(String),

    #[error("algorithm: unrecognized kind {0:?}")]
    UnrecognizedKind(String),

    #[error("algorithm: input {0:?} is also the output")]
    DuplicateInputOutput(String),

    #[error("algorithm: no inputs")]
    NoInputs,

    #[error("algorithm: cancelled")]
    Cancelled,

    #[error("algorithm: stage: {0}")]
    Stage(String),

    #[error("algorithm: model: {0}")]
    Model(String),

    #[error("algorithm: config: {0}")]
    Config(String),

    #[error(transparent)]
    Gallery(#[from] GalleryError),

    #[error("algorithm: {0}")]
    Io(String),
}

impl From<std::io::Error> for AlgorithmError {
    fn from(e: std::io::Error) -> Self {
        AlgorithmError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlgorithmError>;
