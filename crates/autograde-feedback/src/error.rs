use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No response content")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
