use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};

/// Renames images inside one working directory without overwriting anything.
///
/// The existence check and the rename are separate system calls. A file created
/// by another process between the two can still be replaced.
#[derive(Debug, Clone)]
pub struct RenameEngine {
    directory: Option<PathBuf>,
    max_attempts: u32,
}

impl RenameEngine {
    pub fn new(directory: Option<PathBuf>, max_attempts: u32) -> Self {
        Self {
            directory,
            max_attempts,
        }
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = Some(directory.into());
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Rename `old_filename` to `new_title` plus its original extension.
    ///
    /// On collision `_1`, `_2`, ... is appended to the title. Returns the name chosen.
    pub fn rename(&self, old_filename: &str, new_title: &str) -> Result<String> {
        let directory = self.directory.as_deref().ok_or(Error::DirectoryNotSet)?;

        let new_filename = self.free_filename(directory, old_filename, new_title)?;
        let old_path = directory.join(old_filename);
        let new_path = directory.join(&new_filename);

        if let Err(source) = fs::rename(&old_path, &new_path) {
            log_file_error(&old_path, "rename", &source);
            return Err(Error::Rename {
                from: old_path,
                to: new_path,
                source,
            });
        }

        log_fs_modification(
            "rename",
            &old_path,
            Some(&format!("renamed to {}", new_filename)),
        );
        Ok(new_filename)
    }

    fn free_filename(&self, directory: &Path, old_filename: &str, title: &str) -> Result<String> {
        let ext = extension(old_filename);

        let candidate = format!("{}{}", title, ext);
        if !directory.join(&candidate).exists() {
            return Ok(candidate);
        }

        for counter in 1..=self.max_attempts {
            let candidate = format!("{}_{}{}", title, counter, ext);
            if !directory.join(&candidate).exists() {
                return Ok(candidate);
            }
        }

        Err(Error::RenameCollisionExhausted {
            title: title.to_string(),
            extension: ext.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Final suffix of `filename` including the dot, or "" when there is none.
///
/// Leading dots do not start an extension, so `.hidden` has none.
pub fn extension(filename: &str) -> &str {
    let stem_start = filename.len() - filename.trim_start_matches('.').len();
    match filename[stem_start..].rfind('.') {
        Some(pos) => &filename[stem_start + pos..],
        None => "",
    }
}
