//! Error types for URI parsing, handler resolution and configuration.

/// Error type for the classification core.
///
/// None of these escape a navigation decision: the classifier maps them to
/// `Unknown` or `Web`. They surface only from parsers and config loaders.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URI could not be turned into an intent descriptor.
    #[error("URI syntax error in {uri:?}: {reason}")]
    UriSyntax { uri: String, reason: String },

    /// The platform is too old to answer browsable-handler queries.
    #[error("capability unavailable: need SDK {required}, running {actual}")]
    CapabilityUnavailable { required: u32, actual: u32 },

    /// Any other failure while querying installed handlers.
    #[error("handler resolution failed: {0}")]
    Resolution(String),

    /// Configuration JSON was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn syntax(uri: &str, reason: impl Into<String>) -> Self {
        Error::UriSyntax {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type for the classification core.
pub type Result<T> = std::result::Result<T, Error>;
