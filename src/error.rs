pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad file type, file name, price or phone. The call is never attempted.
    #[error("{0}")]
    Validation(String),

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image at quality {quality}: {message}")]
    Encode { quality: u8, message: String },

    /// Transport failure while reading the classification stream, or a
    /// non-success status before any stream was obtained.
    #[error("classification stream failed: {0}")]
    StreamRead(String),

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(String),

    /// The blocking compression task panicked or was cancelled.
    #[error("compression task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Text suitable for a user-facing toast.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Decode(_) => "Failed to load image".to_string(),
            Error::Encode { .. } | Error::Task(_) => "Failed to compress image".to_string(),
            Error::StreamRead(_) | Error::Network(_) => {
                "Failed to classify waste. Please try again.".to_string()
            }
            Error::Storage(msg) => msg.clone(),
        }
    }
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        let message = report
            .iter()
            .next()
            .map(|(_, err)| err.message().to_string())
            .unwrap_or_else(|| report.to_string());
        Error::Validation(message)
    }
}
