use std::path::PathBuf;
use thiserror::Error;

/// Top-level failure taxonomy for the drawing pipeline.
#[derive(Debug, Error)]
pub enum DrawError {
    /// The raster input could not be read or decoded. Fatal to
    /// vectorization, no retry.
    #[error("cannot read image {path}: {source}")]
    InvalidImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// No window matching any accepted title is present. Fatal to
    /// calibration, no retry.
    #[error("no window matching any accepted title")]
    WindowNotFound,

    /// A calibration or brush-map write failed. Reported to the caller but
    /// does not invalidate state already computed this run.
    #[error("failed to persist {what}: {cause}")]
    Persistence {
        what: &'static str,
        cause: anyhow::Error,
    },

    /// A persisted coordinate or brush file is malformed. Degrades to
    /// "absent", never fatal.
    #[error("malformed config data: {0}")]
    ConfigParse(String),
}

/// Outcome of reading a persisted config file, so callers can tell an
/// absent file from a corrupt one instead of collapsing both to `None`.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("file not present")]
    Missing,
    #[error("malformed contents: {0}")]
    Malformed(String),
}

impl ConfigFileError {
    pub fn is_missing(&self) -> bool {
        matches!(self, ConfigFileError::Missing)
    }
}

/// Promotion for callers that treat an unreadable config file as fatal
/// rather than degrading to a default.
impl From<ConfigFileError> for DrawError {
    fn from(err: ConfigFileError) -> Self {
        DrawError::ConfigParse(err.to_string())
    }
}
