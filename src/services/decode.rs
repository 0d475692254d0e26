use image::DynamicImage;
use std::io;
use std::path::Path;
use thiserror::Error;

/// An image that could not be read or decoded. The image is excluded from
/// clustering; the run continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decode collaborator: the only way the core touches image content.
/// Providers consume pixel buffers through this seam, which keeps them
/// testable against fakes.
pub trait DecodeService: Send + Sync {
    fn open(&self, path: &Path) -> Result<DynamicImage, DecodeError>;
}

/// Production decoder backed by the `image` crate.
pub struct ImageDecodeService;

impl DecodeService for ImageDecodeService {
    fn open(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        image::open(path).map_err(|source| DecodeError::Decode {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    #[test]
    fn opens_a_valid_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("valid.png");
        let img = ImageBuffer::from_fn(16, 16, |x, _| Rgb([x as u8 * 16, 0, 0]));
        img.save(&path).unwrap();

        let decoded = ImageDecodeService.open(&path).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn garbage_bytes_fail_with_a_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let result = ImageDecodeService.open(&path);
        assert!(matches!(result, Err(DecodeError::Decode { .. })));
    }
}
