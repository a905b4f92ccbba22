//! CSV file reading into Polars DataFrames.

use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

/// Rows used for dtype inference. Sparse questionnaire columns can be empty
/// for the first few hundred respondents.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Reads a module CSV file with a single header row.
pub fn read_module_frame(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(IngestError::file_read(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        ));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if df.width() == 0 {
        return Err(IngestError::NoColumns {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read module frame"
    );
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_read_module_frame() {
        let file = create_temp_csv("SEQN,BPXSY1,BPXDI1\n93703,120,80\n93704,,0\n");
        let df = read_module_frame(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_read_module_frame_missing_file() {
        let result = read_module_frame(Path::new("/nonexistent/DEMO_J.csv"));
        assert!(matches!(result, Err(IngestError::FileRead { .. })));
    }
}
