use serde::{Deserialize, Serialize};

/// Perceptual fingerprint algorithm variant.
///
/// Fingerprints are only comparable within one variant and bit width;
/// `HashClusterer` rejects mixed runs up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FingerprintAlgorithm {
    /// Average (mean) hash.
    Average,
    /// DCT-preprocessed mean hash, robust against re-encoding and resizing.
    #[default]
    Perceptual,
    /// Gradient (difference) hash.
    Difference,
    /// Grid-based blockhash.
    Blockhash,
}

/// Fixed-width perceptual fingerprint of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: Vec<u8>,
    algorithm: FingerprintAlgorithm,
    bit_width: u32,
}

impl Fingerprint {
    pub fn new(bits: Vec<u8>, algorithm: FingerprintAlgorithm) -> Self {
        let bit_width = (bits.len() * 8) as u32;
        Self {
            bits,
            algorithm,
            bit_width,
        }
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Count of differing bits between two fingerprints of the same width.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        debug_assert_eq!(self.bit_width, other.bit_width);
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}
