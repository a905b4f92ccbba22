//! Loading every configured module from a data directory.

use std::collections::BTreeMap;
use std::path::Path;

use survey_model::{
    AnalysisConfig, InputFingerprint, IssueKind, IssueSeverity, ModuleQuality, ModuleTable,
    RunIssue,
};
use tracing::{info, info_span, warn};

use crate::convert::frame_to_table;
use crate::discovery::resolve_module_files;
use crate::error::{IngestError, Result};
use crate::fingerprint::fingerprint;
use crate::reader::read_module_frame;

/// One module read from disk.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub table: ModuleTable,
    pub quality: ModuleQuality,
    pub fingerprint: InputFingerprint,
}

/// All modules that could be loaded, plus warnings about the ones that could not.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub modules: Vec<LoadedModule>,
    pub issues: Vec<RunIssue>,
}

impl LoadOutcome {
    pub fn tables(&self) -> Vec<ModuleTable> {
        self.modules.iter().map(|m| m.table.clone()).collect()
    }

    pub fn fingerprints(&self) -> Vec<InputFingerprint> {
        self.modules.iter().map(|m| m.fingerprint.clone()).collect()
    }

    pub fn qualities(&self) -> Vec<ModuleQuality> {
        self.modules.iter().map(|m| m.quality.clone()).collect()
    }
}

/// Reads one module file, remaps sentinels and fingerprints it.
pub fn load_module(
    module: &str,
    path: &Path,
    sentinels: &BTreeMap<String, Vec<f64>>,
) -> Result<LoadedModule> {
    let df = read_module_frame(path)?;
    let (table, quality) = frame_to_table(module, &df, sentinels)?;
    let fingerprint = fingerprint(module, path)?;
    Ok(LoadedModule {
        table,
        quality,
        fingerprint,
    })
}

/// Loads every module named in the configuration, in configuration order.
///
/// A missing optional module is reported and skipped; a missing required
/// module is an error.
pub fn load_modules(data_dir: &Path, config: &AnalysisConfig) -> Result<LoadOutcome> {
    let span = info_span!("ingest", data_dir = %data_dir.display());
    let _guard = span.enter();

    let sentinels = config.effective_sentinels();
    let mut outcome = LoadOutcome::default();

    for file in resolve_module_files(data_dir, &config.modules)? {
        let module = file.spec.name.as_str();
        let Some(path) = file.path else {
            let expected = data_dir.join(&file.spec.file);
            if file.spec.required {
                return Err(IngestError::RequiredModuleMissing {
                    module: module.to_string(),
                    path: expected,
                });
            }
            warn!(module, path = %expected.display(), "optional module file not found");
            outcome.issues.push(RunIssue::module_issue(
                IssueSeverity::Warning,
                IssueKind::ModuleNotFound,
                module,
                format!("file {} not found; module skipped", expected.display()),
            ));
            continue;
        };

        let loaded = load_module(module, &path, &sentinels)?;
        info!(
            module,
            rows = loaded.quality.rows,
            columns = loaded.quality.columns,
            "loaded module"
        );
        outcome.modules.push(loaded);
    }

    Ok(outcome)
}
