pub mod detector;

pub use detector::{eligible_text, is_eligible, preview, DuplicateDetector, Ineligible};
