pub mod decode;
pub mod dedupe;
pub mod deleter;
pub mod features;
pub mod hash;
pub mod scan;
