use thiserror::Error;

/// Errors that can surface from a normalization request
///
/// The first four variants are the expected outcomes of normal operation;
/// none of them is a programming fault.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Request does not conform to the accepted request shape
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Page content matched a known bot-protection signature
    #[error("bot-protection content detected ({provider})")]
    BlockedContent { provider: String },

    /// The extraction engine failed or returned unusable data
    #[error("{0}")]
    ExtractionFailure(String),

    /// A required canonical field could not be resolved
    #[error("{0}")]
    SchemaValidation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// The extraction engine could not be constructed
    #[error("Engine setup failed: {0}")]
    EngineSetup(#[from] EngineError),
}

/// Errors raised by an extraction engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to fetch page from URL
    #[error("Failed to fetch URL: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Request failed with status: {0}")]
    Status(u16),

    /// URL could not be parsed or has no host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Host has no dedicated profile and permissive mode is off
    #[error("Website ({0}) is not supported")]
    UnsupportedHost(String),

    /// No schema.org recipe was found on the page
    #[error("No recipe data found on this webpage")]
    NoRecipe,

    /// Recipe data was found but could not be parsed
    #[error("Failed to parse recipe: {0}")]
    Parse(String),
}

/// Failure raised by a single field accessor of an extraction result
#[derive(Error, Debug, Clone, PartialEq)]
#[error("accessor `{field}` failed: {message}")]
pub struct AccessorError {
    pub field: &'static str,
    pub message: String,
}

impl AccessorError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
