//! Access to the Kobo metadata database.
//!
//! The device keeps its library, annotations and signed-in account in a
//! single SQLite file (`.kobo/KoboReader.sqlite`). Only the account table is
//! touched here, and its columns are never interpreted: rows move between
//! databases as opaque tuples in the order SQLite reports the columns.

mod merge;

pub use merge::{MergeReport, create_merged_copy, merge_user_rows};

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use crate::error::{Result, SwitchError};

/// Column names and row count of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub path: PathBuf,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

/// An opaque table row, one value per column.
pub type Row = Vec<Value>;

/// Connection wrapper for a Kobo metadata database.
pub struct KoboDatabase {
    conn: Connection,
    path: PathBuf,
}

impl KoboDatabase {
    /// Opens an existing database for reading and writing.
    ///
    /// Never creates a file: a missing path is reported as
    /// [`SwitchError::DatabaseNotFound`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Opens an existing database read-only.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn open_with(path: &Path, flags: OpenFlags) -> Result<Self> {
        if !path.is_file() {
            return Err(SwitchError::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), ?flags, "Opening metadata database");
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path this database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if a table exists.
    pub fn has_table(&self, table: &str) -> Result<bool> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(true),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(other),
            })?;
        Ok(exists)
    }

    fn require_table(&self, table: &str) -> Result<()> {
        if self.has_table(table)? {
            Ok(())
        } else {
            Err(SwitchError::TableNotFound {
                table: table.to_string(),
                path: self.path.clone(),
            })
        }
    }

    /// Column names of `table`, in declaration order.
    #[instrument(skip(self))]
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        self.require_table(table)?;
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        trace!(count = columns.len(), "Introspected columns");
        Ok(columns)
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.require_table(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Every row of `table`, values in column order.
    #[instrument(skip(self))]
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        self.require_table(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "Read rows");
        Ok(rows)
    }

    /// Columns and row count of `table`.
    pub fn summary(&self, table: &str) -> Result<TableSummary> {
        Ok(TableSummary {
            path: self.path.clone(),
            table: table.to_string(),
            columns: self.columns(table)?,
            rows: self.row_count(table)?,
        })
    }

    /// Deletes every row of `table`.
    ///
    /// Returns the number of rows removed; an already-empty table is fine.
    #[instrument(skip(self))]
    pub fn truncate(&self, table: &str) -> Result<usize> {
        self.require_table(table)?;
        let deleted = self
            .conn
            .execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
        info!(table, deleted, path = %self.path.display(), "Table truncated");
        Ok(deleted)
    }

    /// Replaces the contents of `table` with `rows`.
    ///
    /// `source_columns` names the columns the rows were read with. They must
    /// equal this table's columns, count and order, or nothing is changed.
    /// Delete and insert share one transaction.
    #[instrument(skip(self, source_columns, rows), fields(rows = rows.len()))]
    pub fn replace_rows(
        &mut self,
        table: &str,
        source_columns: &[String],
        rows: &[Row],
    ) -> Result<(usize, usize)> {
        let target_columns = self.columns(table)?;
        check_columns(table, source_columns, &target_columns)?;

        let tx = self.conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            target_columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            (1..=target_columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", "),
        );
        trace!(sql = %insert_sql, "Prepared insert");

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for row in rows {
                if row.len() != target_columns.len() {
                    return Err(SwitchError::ColumnCountMismatch {
                        table: table.to_string(),
                        source_count: row.len(),
                        target_count: target_columns.len(),
                    });
                }
                inserted += stmt.execute(params_from_iter(row.iter()))?;
            }
        }

        tx.commit()?;
        info!(table, removed, inserted, path = %self.path.display(), "Rows replaced");
        Ok((removed, inserted))
    }
}

/// Rejects any difference between two column lists.
///
/// The count is checked first so the common firmware-drift case gets the
/// clearer error.
fn check_columns(table: &str, source: &[String], target: &[String]) -> Result<()> {
    if source.len() != target.len() {
        return Err(SwitchError::ColumnCountMismatch {
            table: table.to_string(),
            source_count: source.len(),
            target_count: target.len(),
        });
    }
    if source != target {
        return Err(SwitchError::ColumnOrderMismatch {
            table: table.to_string(),
            source_columns: source.to_vec(),
            target_columns: target.to_vec(),
        });
    }
    Ok(())
}

/// Quotes an SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
