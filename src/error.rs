use thiserror::Error;

/// Everything that can abort a batch submission. The first four variants
/// are the user-facing rejections the form surfaces verbatim; the last two
/// are storage failures the user cannot fix by editing the form.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid shortcode: {0}")]
    InvalidShortcode(String),

    #[error("Shortcode already in use: {0}")]
    DuplicateShortcode(String),

    #[error("No URLs were submitted")]
    EmptyBatch,

    #[error("At most {0} URLs may be shortened per submission")]
    BatchTooLarge(usize),

    #[error("Failed to write the link map: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Failed to serialize the link map: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ShortenError {
    /// True for failures that should become a 500 rather than a form banner.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Serialize(_))
    }
}
