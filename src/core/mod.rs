pub mod duplicate;
pub mod features;
pub mod fingerprint;
pub mod image;
pub mod plan;
pub mod selection;
