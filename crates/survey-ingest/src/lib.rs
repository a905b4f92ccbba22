//! Survey module ingestion.
//!
//! Reads one CSV extract per survey module into a Polars `DataFrame`, then
//! converts it to a record-oriented `ModuleTable`. Sentinel codes are
//! remapped to missing during the conversion, and each file is fingerprinted
//! for the run report.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use survey_ingest::load_modules;
//! use survey_model::AnalysisConfig;
//!
//! let config = AnalysisConfig::default();
//! let outcome = load_modules(Path::new("data/2017-2018"), &config)?;
//! for module in &outcome.modules {
//!     println!("{}: {} rows", module.table.name, module.quality.rows);
//! }
//! ```

mod convert;
mod discovery;
mod error;
mod fingerprint;
mod loader;
mod reader;

// === Error Types ===
pub use error::{IngestError, Result};

// === Reading ===
pub use convert::{cell_value, frame_to_table};
pub use reader::read_module_frame;

// === Discovery ===
pub use discovery::{ModuleFile, list_csv_files, resolve_module_files};

// === Provenance ===
pub use fingerprint::{fingerprint, sha256_file};

// === Loading ===
pub use loader::{LoadOutcome, LoadedModule, load_module, load_modules};
