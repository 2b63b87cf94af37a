use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("neither {0:?} nor its zip archive exist")]
    NotFound(PathBuf),

    #[error("malformed archive {path:?}: {reason}")]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("sample data of {0} bytes is not a whole number of samples")]
    TruncatedData(usize),

    #[error("refusing to overwrite {0:?}")]
    AlreadyExists(PathBuf),

    #[error("unsupported source raster: {0}")]
    UnsupportedSourceFormat(String),

    #[error("no-data value {0} is not a 16-bit signed integer")]
    InvalidRange(f64),

    #[error("invalid tile name {0:?}")]
    TileName(PathBuf),
}

impl TileError {
    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedSourceFormat(msg.into())
    }
}
