pub type FusionResult<T> = Result<T, FusionError>;

pub const MISSING_IMAGES_MESSAGE: &str = "Please upload both images before generating.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred. Please try again.";

#[derive(thiserror::Error, Debug)]
pub enum FusionError {
    #[error("API_KEY environment variable not set.")]
    MissingCredential,

    #[error("Please upload both images before generating.")]
    MissingImages,

    #[error("A generation is already in progress.")]
    AlreadyLoading,

    #[error("Invalid file type '{mime_type}' for {name}. Please upload an image.")]
    InputRejected { name: String, mime_type: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("Failed to generate image: {0}")]
    GenerationFailed(String),

    #[error("API did not return an image. The response may have been blocked.")]
    NoImageReturned,

    #[error("No generated image to download.")]
    NoResult,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FusionError {
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Wraps any failure below the service boundary, keeping the whole cause chain.
    pub fn generation(err: impl Into<anyhow::Error>) -> Self {
        Self::GenerationFailed(format!("{:#}", err.into()))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingImages | Self::AlreadyLoading)
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Self::GenerationFailed(_) | Self::NoImageReturned)
    }

    /// Message shown to the user for a failed attempt.
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            text
        }
    }
}
