use crate::core::fingerprint::{Fingerprint, FingerprintAlgorithm};
use crate::core::image::ImageRef;
use crate::services::decode::{DecodeError, DecodeService};
use image_hasher::{HashAlg, Hasher, HasherConfig};

/// Perceptual hash provider. One instance computes fingerprints with a fixed
/// algorithm and hash size, so every fingerprint it emits is comparable.
pub struct HashService {
    algorithm: FingerprintAlgorithm,
    hash_size: u32,
}

impl HashService {
    /// Default hash size of 8 gives 64-bit fingerprints.
    pub const DEFAULT_HASH_SIZE: u32 = 8;

    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self {
            algorithm,
            hash_size: Self::DEFAULT_HASH_SIZE,
        }
    }

    pub fn with_hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    fn build_hasher(&self) -> Hasher {
        let config = HasherConfig::new().hash_size(self.hash_size, self.hash_size);
        let config = match self.algorithm {
            FingerprintAlgorithm::Average => config.hash_alg(HashAlg::Mean),
            FingerprintAlgorithm::Perceptual => config.hash_alg(HashAlg::Mean).preproc_dct(),
            FingerprintAlgorithm::Difference => config.hash_alg(HashAlg::Gradient),
            FingerprintAlgorithm::Blockhash => config.hash_alg(HashAlg::Blockhash),
        };
        config.to_hasher()
    }

    /// Decode `image` and compute its fingerprint.
    pub fn compute(
        &self,
        decode: &dyn DecodeService,
        image: &ImageRef,
    ) -> Result<Fingerprint, DecodeError> {
        let pixels = decode.open(image.path())?;
        let hash = self.build_hasher().hash_image(&pixels);
        Ok(Fingerprint::new(hash.as_bytes().to_vec(), self.algorithm))
    }
}
