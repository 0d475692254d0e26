use crate::core::features::{count_good_matches, DescriptorSet};
use crate::core::fingerprint::{Fingerprint, FingerprintAlgorithm};
use crate::core::image::ImageRef;
use crate::progress::{ClusterPhase, ClusterProgress, ProgressSender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Caller configuration errors. These abort a clustering call before any
/// work starts; they never produce partial results.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fingerprint width mismatch: expected {expected} bits, found {found} bits for {path}")]
    MixedFingerprintWidths {
        expected: u32,
        found: u32,
        path: String,
    },

    #[error("fingerprint algorithm mismatch: expected {expected:?}, found {found:?} for {path}")]
    MixedFingerprintAlgorithms {
        expected: FingerprintAlgorithm,
        found: FingerprintAlgorithm,
        path: String,
    },

    #[error("ratio threshold must be within (0, 1), got {0}")]
    InvalidRatioThreshold(f32),

    #[error("min_matches must be at least 1, got {0}")]
    InvalidMinMatches(usize),
}

/// A set of images one clustering run considers duplicates of each other.
///
/// Always has at least two members; groups from one run never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    index: usize,
    members: Vec<ImageRef>,
}

impl DuplicateGroup {
    pub(crate) fn new(index: usize, members: Vec<ImageRef>) -> Self {
        debug_assert!(members.len() >= 2);
        Self { index, members }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn members(&self) -> &[ImageRef] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.members.iter().any(|member| member.id() == image.id())
    }
}

/// Result of one clustering run. A cancelled run still carries every group
/// that was finalized before the stop signal was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    pub groups: Vec<DuplicateGroup>,
    pub cancelled: bool,
}

pub(crate) fn validate_feature_params(
    ratio_threshold: f32,
    min_matches: usize,
) -> Result<(), ConfigError> {
    if !(ratio_threshold > 0.0 && ratio_threshold < 1.0) {
        return Err(ConfigError::InvalidRatioThreshold(ratio_threshold));
    }
    if min_matches < 1 {
        return Err(ConfigError::InvalidMinMatches(min_matches));
    }
    Ok(())
}

/// Groups images by fingerprint similarity under a Hamming-distance
/// threshold.
///
/// Greedy single pass, order dependent by design: each image is compared to
/// the representatives of the groups formed so far; the closest one within
/// the threshold wins (ties broken by representative insertion order), and
/// an image that matches nothing becomes a new representative. Deterministic
/// for a fixed input order, threshold and algorithm.
pub struct HashClusterer {
    threshold: u32,
    progress_sender: Option<ProgressSender>,
    cancellation_token: Arc<AtomicBool>,
}

impl HashClusterer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            progress_sender: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_sender(mut self, sender: ProgressSender) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub fn cluster(
        &self,
        fingerprints: &[(ImageRef, Fingerprint)],
    ) -> Result<ClusterOutcome, ConfigError> {
        if let Some((_, first)) = fingerprints.first() {
            for (image, fingerprint) in fingerprints {
                if fingerprint.bit_width() != first.bit_width() {
                    return Err(ConfigError::MixedFingerprintWidths {
                        expected: first.bit_width(),
                        found: fingerprint.bit_width(),
                        path: image.path().display().to_string(),
                    });
                }
                if fingerprint.algorithm() != first.algorithm() {
                    return Err(ConfigError::MixedFingerprintAlgorithms {
                        expected: first.algorithm(),
                        found: fingerprint.algorithm(),
                        path: image.path().display().to_string(),
                    });
                }
            }
        }

        let total_images = fingerprints.len();
        let mut representatives: Vec<&Fingerprint> = Vec::new();
        let mut groups: Vec<Vec<ImageRef>> = Vec::new();
        let mut cancelled = false;

        for (processed, (image, fingerprint)) in fingerprints.iter().enumerate() {
            if self.cancellation_token.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let closest = representatives
                .iter()
                .enumerate()
                .map(|(group_index, representative)| {
                    (group_index, representative.hamming_distance(fingerprint))
                })
                .min_by_key(|&(_, distance)| distance);

            match closest {
                Some((group_index, distance)) if distance <= self.threshold => {
                    groups[group_index].push(image.clone());
                }
                _ => {
                    representatives.push(fingerprint);
                    groups.push(vec![image.clone()]);
                }
            }

            self.send_progress(ClusterProgress {
                images_processed: processed + 1,
                total_images,
                current_image: image.path().display().to_string(),
                phase: ClusterPhase::Matching,
            });
        }

        let groups = finalize_groups(groups);
        log::info!(
            "hash clustering: {} duplicate group(s) from {} image(s){}",
            groups.len(),
            total_images,
            if cancelled { " (cancelled)" } else { "" }
        );

        if !cancelled {
            self.send_progress(ClusterProgress {
                images_processed: total_images,
                total_images,
                current_image: String::new(),
                phase: ClusterPhase::Complete,
            });
        }

        Ok(ClusterOutcome { groups, cancelled })
    }

    fn send_progress(&self, progress: ClusterProgress) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(progress);
        }
    }
}

/// Groups images by descriptor-match count under a ratio test.
///
/// Pairwise scan in input order: an unprocessed image seeds a group and
/// claims every later unprocessed image whose good-match count reaches
/// `min_matches`. Duplicate relationships are not transitive here; an image
/// claimed by an earlier seed is never reconsidered, so A~B and B~C does not
/// imply A and C end up grouped. That mirrors the conservative behavior of
/// the scan-order design this is drawn from and is a known limitation.
pub struct FeatureClusterer {
    ratio_threshold: f32,
    min_matches: usize,
    progress_sender: Option<ProgressSender>,
    cancellation_token: Arc<AtomicBool>,
}

impl FeatureClusterer {
    pub fn new(ratio_threshold: f32, min_matches: usize) -> Self {
        Self {
            ratio_threshold,
            min_matches,
            progress_sender: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_sender(mut self, sender: ProgressSender) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub fn cluster(&self, sets: &[DescriptorSet]) -> Result<ClusterOutcome, ConfigError> {
        validate_feature_params(self.ratio_threshold, self.min_matches)?;

        let total_images = sets.len();
        let mut processed = vec![false; total_images];
        let mut groups: Vec<Vec<ImageRef>> = Vec::new();
        let mut cancelled = false;

        for seed in 0..total_images {
            if self.cancellation_token.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            if !processed[seed] {
                let mut members = vec![sets[seed].image().clone()];

                for candidate in (seed + 1)..total_images {
                    if processed[candidate] {
                        continue;
                    }

                    let good_matches = count_good_matches(
                        &sets[seed],
                        &sets[candidate],
                        self.ratio_threshold,
                    );
                    if good_matches >= self.min_matches {
                        members.push(sets[candidate].image().clone());
                        processed[candidate] = true;
                    }
                }

                if members.len() > 1 {
                    processed[seed] = true;
                    groups.push(members);
                }
            }

            self.send_progress(ClusterProgress {
                images_processed: seed + 1,
                total_images,
                current_image: sets[seed].image().path().display().to_string(),
                phase: ClusterPhase::Matching,
            });
        }

        let groups = finalize_groups(groups);
        log::info!(
            "feature clustering: {} duplicate group(s) from {} image(s){}",
            groups.len(),
            total_images,
            if cancelled { " (cancelled)" } else { "" }
        );

        if !cancelled {
            self.send_progress(ClusterProgress {
                images_processed: total_images,
                total_images,
                current_image: String::new(),
                phase: ClusterPhase::Complete,
            });
        }

        Ok(ClusterOutcome { groups, cancelled })
    }

    fn send_progress(&self, progress: ClusterProgress) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(progress);
        }
    }
}

/// Drop singleton groups and assign stable indexes to the survivors.
fn finalize_groups(groups: Vec<Vec<ImageRef>>) -> Vec<DuplicateGroup> {
    groups
        .into_iter()
        .filter(|members| members.len() >= 2)
        .enumerate()
        .map(|(index, members)| DuplicateGroup::new(index, members))
        .collect()
}
