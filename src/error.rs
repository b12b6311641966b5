use crate::asset::AssetId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single lifecycle request. None of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("asset not found: {0}")]
    NotFound(AssetId),

    #[error("could not retrieve content at {0}, check the asset uri")]
    ContentUnreachable(String),

    #[error("invalid asset: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
