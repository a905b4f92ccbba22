use survey_model::SubjectId;
use thiserror::Error;

/// Dataset-wide merge failures. Each aborts the run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("module {module} has no identifier column {column}")]
    Schema { module: String, column: String },

    #[error("module {module} repeats {} subject ID(s): {}", .duplicates.len(), format_duplicates(.duplicates))]
    DuplicateKey {
        module: String,
        /// Every repeated ID with its occurrence count, in ID order.
        duplicates: Vec<(SubjectId, usize)>,
    },

    #[error("column {column} appears in both {first} and {second}")]
    ColumnConflict {
        column: String,
        first: String,
        second: String,
    },
}

fn format_duplicates(duplicates: &[(SubjectId, usize)]) -> String {
    duplicates
        .iter()
        .map(|(id, count)| format!("{id} (x{count})"))
        .collect::<Vec<_>>()
        .join(", ")
}
