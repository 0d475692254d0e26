use crate::core::image::ImageRef;
use glob::Pattern;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions treated as images during directory scans, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid exclude pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{path} is not a directory")]
    NotADirectory { path: String },
}

/// Walk `roots` recursively and register every supported image file.
///
/// Results are sorted by path so repeated scans of the same tree are
/// deterministic. Files whose metadata cannot be read are logged and
/// skipped rather than failing the scan.
pub fn scan_image_paths(
    roots: &[PathBuf],
    exclude_patterns: &[String],
) -> Result<Vec<ImageRef>, ScanError> {
    let excludes = exclude_patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| ScanError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut paths = Vec::new();
    for root in roots {
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.display().to_string(),
            });
        }

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_supported_image(path) {
                continue;
            }
            if excludes.iter().any(|pattern| pattern.matches_path(path)) {
                continue;
            }
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match ImageRef::register(&path) {
            Ok(image) => images.push(image),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }

    log::info!("scan found {} image files", images.len());
    Ok(images)
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
