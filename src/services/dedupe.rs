use crate::core::duplicate::{
    validate_feature_params, ClusterOutcome, ConfigError, FeatureClusterer, HashClusterer,
};
use crate::core::fingerprint::FingerprintAlgorithm;
use crate::core::image::ImageRef;
use crate::progress::{ClusterPhase, ClusterProgress, ProgressSender};
use crate::services::decode::{DecodeError, DecodeService};
use crate::services::features::FeatureService;
use crate::services::hash::HashService;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a dedupe run decides that two images are duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterMethod {
    /// Fingerprint similarity under a Hamming-distance threshold.
    PerceptualHash {
        algorithm: FingerprintAlgorithm,
        threshold: u32,
    },
    /// Keypoint descriptor matching under a ratio test.
    FeatureMatch {
        ratio_threshold: f32,
        min_matches: usize,
    },
}

/// End-to-end duplicate detection: decodes images, extracts fingerprints or
/// descriptors in parallel, then clusters them.
///
/// Extraction runs on the rayon pool; decode failures are logged and the
/// affected image is excluded from clustering. The cancellation token is
/// shared with the clusterer, so one `cancel()` stops both phases.
#[derive(Clone)]
pub struct DedupeService {
    decode: Arc<dyn DecodeService>,
    progress_sender: Option<ProgressSender>,
    cancellation_token: Arc<AtomicBool>,
}

impl DedupeService {
    pub fn new(decode: Arc<dyn DecodeService>) -> Self {
        Self {
            decode,
            progress_sender: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_sender(mut self, sender: ProgressSender) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    /// Run duplicate detection over `images` with the given method.
    pub fn find_duplicate_groups(
        &self,
        images: &[ImageRef],
        method: &ClusterMethod,
    ) -> Result<ClusterOutcome, ConfigError> {
        match method {
            ClusterMethod::PerceptualHash {
                algorithm,
                threshold,
            } => {
                let hash_service = HashService::new(*algorithm);
                let (fingerprints, cancelled) = self.extract_all(images, |image| {
                    hash_service
                        .compute(self.decode.as_ref(), image)
                        .map(|fingerprint| (image.clone(), fingerprint))
                });
                if cancelled {
                    return Ok(ClusterOutcome {
                        groups: Vec::new(),
                        cancelled: true,
                    });
                }

                let mut clusterer = HashClusterer::new(*threshold)
                    .with_cancellation_token(self.cancellation_token.clone());
                if let Some(sender) = &self.progress_sender {
                    clusterer = clusterer.with_progress_sender(sender.clone());
                }
                clusterer.cluster(&fingerprints)
            }
            ClusterMethod::FeatureMatch {
                ratio_threshold,
                min_matches,
            } => {
                // Parameter errors abort before any image is decoded.
                validate_feature_params(*ratio_threshold, *min_matches)?;

                let feature_service = FeatureService::new();
                let (sets, cancelled) = self.extract_all(images, |image| {
                    feature_service.compute(self.decode.as_ref(), image)
                });
                if cancelled {
                    return Ok(ClusterOutcome {
                        groups: Vec::new(),
                        cancelled: true,
                    });
                }

                let mut clusterer = FeatureClusterer::new(*ratio_threshold, *min_matches)
                    .with_cancellation_token(self.cancellation_token.clone());
                if let Some(sender) = &self.progress_sender {
                    clusterer = clusterer.with_progress_sender(sender.clone());
                }
                clusterer.cluster(&sets)
            }
        }
    }

    /// Run detection on the blocking pool so async callers stay responsive.
    pub fn spawn(
        &self,
        images: Vec<ImageRef>,
        method: ClusterMethod,
    ) -> JoinHandle<Result<ClusterOutcome, ConfigError>> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.find_duplicate_groups(&images, &method))
    }

    fn extract_all<T, F>(&self, images: &[ImageRef], extract: F) -> (Vec<T>, bool)
    where
        T: Send,
        F: Fn(&ImageRef) -> Result<T, DecodeError> + Sync,
    {
        let total_images = images.len();
        let counter = AtomicUsize::new(0);

        let results: Vec<Option<T>> = images
            .par_iter()
            .map(|image| {
                if self.cancellation_token.load(Ordering::Relaxed) {
                    return None;
                }

                let result = extract(image);
                let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                self.send_progress(ClusterProgress {
                    images_processed: done,
                    total_images,
                    current_image: image.path().display().to_string(),
                    phase: ClusterPhase::Extracting,
                });

                match result {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("excluding {}: {}", image.path().display(), e);
                        None
                    }
                }
            })
            .collect();

        let cancelled = self.cancellation_token.load(Ordering::Relaxed);
        (results.into_iter().flatten().collect(), cancelled)
    }

    fn send_progress(&self, progress: ClusterProgress) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(progress);
        }
    }
}
