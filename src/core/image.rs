use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// Handle to a registered source image.
///
/// Carries the stable path plus the file metadata the default keep policy
/// ranks on. Immutable once created; identity is the opaque `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    id: String,
    path: PathBuf,
    size_bytes: u64,
    modified: SystemTime,
}

impl ImageRef {
    /// Register an image path, capturing its size and modification time.
    pub fn register<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified()?;

        Ok(Self {
            id: format!("img_{}", Uuid::new_v4().simple()),
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            modified,
        })
    }

    /// Build an ImageRef with caller-supplied metadata. Intended for fakes
    /// and for callers that already stat their files.
    pub fn with_metadata<P: AsRef<Path>>(path: P, size_bytes: u64, modified: SystemTime) -> Self {
        Self {
            id: format!("img_{}", Uuid::new_v4().simple()),
            path: path.as_ref().to_path_buf(),
            size_bytes,
            modified,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}
