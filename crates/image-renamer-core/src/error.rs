use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed cause kept behind a title generation failure
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Custom error types for the image-renamer library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON from the model endpoint
    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// The model endpoint answered with a non-success status
    #[error("Model endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The installed model list could not be read
    #[error("Model catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A title could not be produced for an image
    #[error("{message}")]
    TitleGeneration {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Rename requested before a working directory was chosen
    #[error("No directory set")]
    DirectoryNotSet,

    /// The filesystem refused the rename
    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A run was asked for without what it needs
    #[error("{0}")]
    PreconditionNotMet(#[from] crate::orchestrator::Precondition),

    /// Every suffixed candidate up to the cap already exists
    #[error("No free filename for '{title}{extension}' after {attempts} attempts")]
    RenameCollisionExhausted {
        title: String,
        extension: String,
        attempts: u32,
    },
}

impl Error {
    /// Wrap a downstream failure as a title generation error
    pub fn title_generation<E>(err: E) -> Self
    where
        E: Into<Cause>,
    {
        let source = err.into();
        Self::TitleGeneration {
            message: format!("Failed to generate title: {}", source),
            source: Some(source),
        }
    }

    /// True for failures that happened while producing a title
    pub fn is_title_generation(&self) -> bool {
        matches!(self, Self::TitleGeneration { .. })
    }

    /// True for failures that happened while renaming on disk
    pub fn is_rename(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotSet | Self::Rename { .. } | Self::RenameCollisionExhausted { .. }
        )
    }
}
