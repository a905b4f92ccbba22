//! Merge and derivation for the survey analysis.
//!
//! - **merge**: full outer join of module tables on the subject identifier
//! - **derive**: replicate means, hypertension status and severity, and the
//!   demographic categories, driven by `DerivationRules`
//! - **pipeline**: schema screening followed by merge and derivation

pub mod derive;
pub mod error;
pub mod merge;
pub mod pipeline;

pub use derive::{DerivationRules, derive_dataset, derive_record};
pub use error::MergeError;
pub use merge::{MergeOutput, merge_modules};
pub use pipeline::{PreparedDataset, ScreenedModules, prepare_dataset, screen_modules};
