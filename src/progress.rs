use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Channel end a clustering run pushes its updates into.
pub type ProgressSender = mpsc::UnboundedSender<ClusterProgress>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterPhase {
    /// Computing fingerprints or descriptors, one image at a time.
    Extracting,
    /// Comparing images and building duplicate groups.
    Matching,
    Complete,
}

/// One progress update, emitted once per image processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProgress {
    pub images_processed: usize,
    pub total_images: usize,
    pub current_image: String,
    pub phase: ClusterPhase,
}

impl ClusterProgress {
    /// Fraction complete within the current phase, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total_images == 0 {
            return 1.0;
        }
        self.images_processed as f32 / self.total_images as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_handles_empty_runs() {
        let progress = ClusterProgress {
            images_processed: 0,
            total_images: 0,
            current_image: String::new(),
            phase: ClusterPhase::Complete,
        };
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn progress_serializes_for_ui_consumers() {
        let progress = ClusterProgress {
            images_processed: 3,
            total_images: 10,
            current_image: "/photos/a.jpg".to_string(),
            phase: ClusterPhase::Matching,
        };

        let json = serde_json::to_string(&progress).unwrap();
        let back: ClusterProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }
}
