use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = SorterError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SorterError {
    /// Startup configuration is unusable (watch directory, label file, model file).
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to decode image {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("inference failed: {0}")]
    Oracle(String),

    #[error("oracle returned {actual} scores but the label table has {expected} labels")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The destination already holds a file with the same name. The source is left untouched.
    #[error("destination already exists: {}", .destination.display())]
    Collision { destination: PathBuf },

    #[error("filesystem operation failed on {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("processing task failed: {0}")]
    Task(String),
}

impl SorterError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SorterError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SorterError::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

