use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_file_error;
use crate::types::ImageFile;

/// List the images directly inside `directory`, sorted by filename.
///
/// The listing is not recursive; subdirectories and their contents are ignored.
pub fn discover_images(directory: &Path, config: &Config) -> Result<Vec<ImageFile>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let mut image_files = Vec::new();

    // Symlinked images are listed like regular files
    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Log error but continue with other files
                let path = e.path().unwrap_or(directory).to_path_buf();
                log_file_error(&path, "list", &e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(filename) = entry.file_name().to_str() else {
            log::warn!("Skipping non UTF-8 filename: {}", entry.path().display());
            continue;
        };

        if has_image_extension(filename, &config.image_extensions) {
            image_files.push(ImageFile::new(directory, filename));
        }
    }

    image_files.sort_by(|a, b| a.filename.cmp(&b.filename));
    log::info!(
        "Found {} images in {}",
        image_files.len(),
        directory.display()
    );

    Ok(image_files)
}

/// Returns true if `filename` ends with one of `extensions`, ignoring case
pub fn has_image_extension<S: AsRef<str>>(filename: &str, extensions: &[S]) -> bool {
    let lower = filename.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.as_ref().to_lowercase()))
}

// -- Tests --
