use std::path::PathBuf;

/// Errors raised by the dataset tools.
///
/// Validation variants (`NotFound`, `InvalidRatio`, `EmptyDataset`, ...) are returned before
/// anything is written. Per-file failures during bulk transfers are not errors: they are
/// collected into [`crate::types::ProcessingStats`] unless fail-fast mode turns them into
/// [`DatasetError::Aborted`].
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A source directory, class file or paired file does not exist.
    #[error("path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Ratios outside [0, 1] or not summing to 1.
    #[error("invalid split ratios: {0}")]
    InvalidRatio(String),

    /// No matched image/label pairs, nothing to split.
    #[error("no matched image/label pairs to split")]
    EmptyDataset,

    #[error("class list {} contains no class names", path.display())]
    EmptyClassList { path: PathBuf },

    #[error("destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("missing required option --{0} (pass it on the command line or in --config)")]
    MissingArgument(&'static str),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize dataset descriptor: {0}")]
    Descriptor(#[from] serde_yaml::Error),

    #[error("failed to write run report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("invalid config file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Fail-fast mode stopped a bulk transfer.
    #[error("aborted after {failures} failed or conflicting transfer(s)")]
    Aborted { failures: usize },
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
