//! Duplicate-image detection and safe-deletion planning.
//!
//! The pipeline: scan directories for image files, fingerprint or describe
//! them, cluster near-duplicates into groups, pick keepers per group, then
//! build and execute a deletion plan that can never delete a whole group.
//!
//! Detection runs on the rayon pool with cooperative cancellation and
//! per-image progress updates, so a UI can drive it from an async runtime
//! via [`DedupeService::spawn`].

pub mod core;
pub mod progress;
pub mod services;

pub use crate::core::duplicate::{
    ClusterOutcome, ConfigError, DuplicateGroup, FeatureClusterer, HashClusterer,
};
pub use crate::core::features::{Descriptor, DescriptorSet};
pub use crate::core::fingerprint::{Fingerprint, FingerprintAlgorithm};
pub use crate::core::image::ImageRef;
pub use crate::core::plan::{
    DeletionOutcome, DeletionPlan, DeletionPlanner, DeletionReport, DeletionStatus, FileDeleter,
    PlanError,
};
pub use crate::core::selection::{KeepPolicy, LargestNewest, Selection, SelectionError};
pub use crate::progress::{ClusterPhase, ClusterProgress, ProgressSender};
pub use crate::services::decode::{DecodeError, DecodeService, ImageDecodeService};
pub use crate::services::dedupe::{ClusterMethod, DedupeService};
pub use crate::services::deleter::FsFileDeleter;
pub use crate::services::features::FeatureService;
pub use crate::services::hash::HashService;
pub use crate::services::scan::{scan_image_paths, ScanError, SUPPORTED_EXTENSIONS};
