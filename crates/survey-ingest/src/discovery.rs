//! Resolution of configured modules to files in the data directory.

use std::path::{Path, PathBuf};

use survey_model::ModuleSpec;

use crate::error::{IngestError, Result};

/// A configured module and where its file was found.
#[derive(Debug, Clone)]
pub struct ModuleFile {
    pub spec: ModuleSpec,
    /// `None` when no matching file exists.
    pub path: Option<PathBuf>,
}

/// Lists all CSV files in a directory, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Matches each configured module to a file. File names compare case-insensitively.
pub fn resolve_module_files(data_dir: &Path, modules: &[ModuleSpec]) -> Result<Vec<ModuleFile>> {
    let files = list_csv_files(data_dir)?;
    let resolved = modules
        .iter()
        .map(|spec| {
            let wanted = data_dir.join(&spec.file);
            let path = if wanted.is_file() {
                Some(wanted)
            } else {
                files
                    .iter()
                    .find(|candidate| same_file_name(candidate, &wanted))
                    .cloned()
            };
            ModuleFile {
                spec: spec.clone(),
                path,
            }
        })
        .collect();
    Ok(resolved)
}

fn same_file_name(candidate: &Path, wanted: &Path) -> bool {
    match (
        candidate.file_name().and_then(|n| n.to_str()),
        wanted.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b) && candidate.parent() == wanted.parent(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_file_name_ignores_case() {
        let dir = Path::new("/data");
        assert!(same_file_name(&dir.join("demo_j.csv"), &dir.join("DEMO_J.csv")));
        assert!(!same_file_name(&dir.join("BPX_J.csv"), &dir.join("DEMO_J.csv")));
    }

    #[test]
    fn test_list_csv_files_missing_dir() {
        let result = list_csv_files(Path::new("/nonexistent/survey"));
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }
}
