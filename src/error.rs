use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameSyncError {
    /// Detected video segments disagree with the number of video files.
    #[error("telemetry contains {segments} video segments but {videos} video files were given")]
    AlignmentMismatch { segments: usize, videos: usize },

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: line {line}: {message}")]
    Telemetry {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("video {path}: {message}")]
    Video { path: PathBuf, message: String },

    #[error("bulk store already exists: {0}")]
    StoreCollision(PathBuf),

    /// Transform or write failure while persisting one frame.
    #[error("frame {index} ({filename}): {message}")]
    Persist {
        index: usize,
        filename: String,
        message: String,
    },

    #[error("cannot georeference {path}: {message}")]
    Georeference { path: PathBuf, message: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("pipeline worker failed: {0}")]
    Worker(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bulk store {path}: {message}")]
    Store { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, FrameSyncError>;

impl FrameSyncError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        FrameSyncError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        FrameSyncError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn image(path: &Path, source: image::ImageError) -> Self {
        FrameSyncError::Image {
            path: path.to_path_buf(),
            source,
        }
    }
}
