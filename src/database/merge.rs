//! Transplanting account rows between metadata databases.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use super::KoboDatabase;
use crate::error::{Result, SwitchError};
use crate::replicate::FileCopier;

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// The merged database file.
    pub working_path: PathBuf,
    /// Database the rows were read from.
    pub rows_source: PathBuf,
    pub table: String,
    /// Columns of the merged table (those of the working copy).
    pub columns: Vec<String>,
    pub rows_removed: usize,
    pub rows_inserted: usize,
}

/// Replace the rows of `table` in `working` with the rows of `table` in
/// `rows_source`.
///
/// `working` keeps its schema and every other table. The column lists of both
/// tables must match exactly; otherwise the merge fails and `working` is
/// left as it was.
#[instrument(skip_all, fields(working = %working.display(), rows_source = %rows_source.display(), table = %table))]
pub fn merge_user_rows(working: &Path, rows_source: &Path, table: &str) -> Result<MergeReport> {
    let mut target = KoboDatabase::open(working)?;
    let columns = target.columns(table)?;

    let (source_columns, rows) = {
        let source = KoboDatabase::open_read_only(rows_source)?;
        (source.columns(table)?, source.rows(table)?)
    };

    let (rows_removed, rows_inserted) = target.replace_rows(table, &source_columns, &rows)?;

    info!(rows_removed, rows_inserted, "Account rows merged");
    Ok(MergeReport {
        working_path: working.to_path_buf(),
        rows_source: rows_source.to_path_buf(),
        table: table.to_string(),
        columns,
        rows_removed,
        rows_inserted,
    })
}

/// Copy `schema_db` to `output` and merge the rows of `rows_db` into the copy.
///
/// Neither input is modified. `output` must not exist yet.
#[instrument(skip(copier))]
pub fn create_merged_copy<C: FileCopier + ?Sized>(
    copier: &C,
    rows_db: &Path,
    schema_db: &Path,
    output: &Path,
    table: &str,
) -> Result<MergeReport> {
    if output.exists() {
        return Err(SwitchError::OutputExists {
            path: output.to_path_buf(),
        });
    }
    if !schema_db.is_file() {
        return Err(SwitchError::DatabaseNotFound {
            path: schema_db.to_path_buf(),
        });
    }
    if !rows_db.is_file() {
        return Err(SwitchError::DatabaseNotFound {
            path: rows_db.to_path_buf(),
        });
    }

    copier.copy_file(schema_db, output)?;
    merge_user_rows(output, rows_db, table)
}
