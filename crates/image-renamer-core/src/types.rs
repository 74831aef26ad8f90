use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Placeholder used when sanitizing leaves nothing behind
pub const PLACEHOLDER_TITLE: &str = "unnamed_image";

/// Representation of an image file in the working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    /// Directory containing the image
    pub directory: PathBuf,

    /// File name including extension
    pub filename: String,
}

impl ImageFile {
    pub fn new(directory: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }

    /// Full path to the image file
    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

impl fmt::Display for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

/// A sanitized, filename-safe title produced by the model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedTitle(String);

impl GeneratedTitle {
    /// Wrap an already sanitized value. Empty input becomes the placeholder.
    pub(crate) fn from_sanitized(value: String) -> Self {
        if value.is_empty() {
            Self(PLACEHOLDER_TITLE.to_string())
        } else {
            Self(value)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GeneratedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneratedTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Aggregate result of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of images in the run
    pub total: usize,

    /// Images renamed on disk
    pub renamed: usize,

    /// Images whose title generation or rename failed
    pub failed: usize,

    /// Images skipped because the run was cancelled
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Number of images that were attempted
    pub fn processed(&self) -> usize {
        self.renamed + self.failed
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    /// Status line shown when the run completes
    pub fn status_text(&self) -> String {
        let mut text = format!("Complete! Renamed: {}", self.renamed);
        if self.failed > 0 {
            text.push_str(&format!(", Failed: {}", self.failed));
        }
        if self.cancelled > 0 {
            text.push_str(&format!(", Cancelled: {}", self.cancelled));
        }
        text
    }
}

/// Result of a single-image run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SingleOutcome {
    Renamed {
        index: usize,
        old_filename: String,
        new_filename: String,
        title: String,
    },
    Failed {
        index: usize,
        filename: String,
        message: String,
    },
}

impl SingleOutcome {
    pub fn is_renamed(&self) -> bool {
        matches!(self, Self::Renamed { .. })
    }

    /// Status line shown when the run completes
    pub fn status_text(&self) -> String {
        match self {
            Self::Renamed { title, .. } => format!("Successfully renamed to: {}", title),
            Self::Failed { message, .. } => format!("Error: {}", message),
        }
    }
}
