use thiserror::Error;

/// Error taxonomy for scrapbook operations.
///
/// Data/schema errors always propagate to the immediate caller; there is no
/// retry logic anywhere in this crate. The notebook read path degrades
/// best-effort instead: unrecognized output units are skipped silently, and
/// only a recognized-but-malformed payload fails hard.
#[derive(Error, Debug)]
pub enum ScrapbookError {
    /// A scrap or payload failed JSON Schema validation.
    /// Carries the underlying validator's violations for diagnostics.
    #[error("scrap (name={name}) contents do not conform to required type structures: {message}")]
    DataValidation {
        name: String,
        message: String,
        violations: Vec<String>,
    },

    #[error("no encoder found for \"{0}\" encoder type")]
    MissingEncoder(String),

    #[error("no store found for \"{store}\" store at \"{reference}\" reference")]
    MissingStore { store: String, reference: String },

    /// Capability probing found no encoder claiming the value.
    #[error("no supported encoder registered: {0}")]
    NotSupported(String),

    #[error("scrap '{0}' is not available in this notebook")]
    ScrapNotFound(String),

    #[error("requires an '.ipynb' file extension. Provided path: '{0}'")]
    IncompatiblePath(String),

    /// A code path that must not be reached was invoked (e.g. asking the
    /// display encoder to transform data).
    #[error("internal contract violation: {0}")]
    Internal(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary serialization error: {0}")]
    Binary(#[from] bincode::Error),
}

impl ScrapbookError {
    /// Builds a [`ScrapbookError::DataValidation`] from validator output.
    pub fn data_validation(
        name: impl Into<String>,
        message: impl Into<String>,
        violations: Vec<String>,
    ) -> Self {
        Self::DataValidation {
            name: name.into(),
            message: message.into(),
            violations,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapbookError>;
