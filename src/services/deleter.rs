use crate::core::plan::FileDeleter;
use std::fs;
use std::io;
use std::path::Path;

/// Deletes files from the local filesystem.
pub struct FsFileDeleter;

impl FileDeleter for FsFileDeleter {
    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
