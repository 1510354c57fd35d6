//! Error types for koboswitch operations.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for account-switch operations.
#[derive(Error, Debug)]
pub enum SwitchError {
    // Path errors
    #[error("Kobo mount point {} does not exist", path.display())]
    MountPointNotFound { path: PathBuf },

    #[error("Kobo mount point {} is not available", path.display())]
    MountPointUnavailable { path: PathBuf },

    #[error("Backup destination {} already exists", path.display())]
    BackupExists { path: PathBuf },

    #[error(
        "Backup {} and mount point {} overlap; neither may lie inside the other",
        backup.display(),
        mount.display()
    )]
    NestedRoots { mount: PathBuf, backup: PathBuf },

    #[error("Source directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Output file {} already exists", path.display())]
    OutputExists { path: PathBuf },

    // Database errors
    #[error("Database not found: {}", path.display())]
    DatabaseNotFound { path: PathBuf },

    #[error("Table '{table}' not found in {}", path.display())]
    TableNotFound { table: String, path: PathBuf },

    #[error(
        "Schema mismatch on table '{table}': source has {source_count} columns, target has {target_count}"
    )]
    ColumnCountMismatch {
        table: String,
        source_count: usize,
        target_count: usize,
    },

    #[error(
        "Schema mismatch on table '{table}': source columns {source_columns:?}, target columns {target_columns:?}"
    )]
    ColumnOrderMismatch {
        table: String,
        source_columns: Vec<String>,
        target_columns: Vec<String>,
    },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // Workflow errors
    #[error("Aborted at '{checkpoint}' by operator")]
    Aborted { checkpoint: String },

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // General errors
    #[error("Failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl SwitchError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MountPointNotFound { .. }
                | Self::MountPointUnavailable { .. }
                | Self::BackupExists { .. }
                | Self::NestedRoots { .. }
                | Self::OutputExists { .. }
                | Self::Aborted { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigInvalid(_)
                | Self::InvalidPattern { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MountPointNotFound { .. } => {
                Some("Connect the Kobo over USB and pass the directory it is mounted on")
            }
            Self::MountPointUnavailable { .. } => Some(
                "Reconnect the Kobo; the backup is untouched, re-run `koboswitch restore` once it is mounted",
            ),
            Self::BackupExists { .. } => {
                Some("Pass a backup destination that does not exist yet")
            }
            Self::NestedRoots { .. } => {
                Some("Keep the backup on a different drive or folder than the Kobo")
            }
            Self::OutputExists { .. } => Some("Remove the file or choose another --output path"),
            Self::ColumnCountMismatch { .. } | Self::ColumnOrderMismatch { .. } => Some(
                "Both databases must come from the same firmware; the backup root still holds the original",
            ),
            Self::ConfigNotFound { .. } => Some("Check the --config path"),
            _ => None,
        }
    }

    /// Stable machine-readable name for robot output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MountPointNotFound { .. } => "mount_point_not_found",
            Self::MountPointUnavailable { .. } => "mount_point_unavailable",
            Self::BackupExists { .. } => "backup_exists",
            Self::NestedRoots { .. } => "nested_roots",
            Self::SourceNotFound { .. } => "source_not_found",
            Self::NotADirectory { .. } => "not_a_directory",
            Self::OutputExists { .. } => "output_exists",
            Self::DatabaseNotFound { .. } => "database_not_found",
            Self::TableNotFound { .. } => "table_not_found",
            Self::ColumnCountMismatch { .. } => "column_count_mismatch",
            Self::ColumnOrderMismatch { .. } => "column_order_mismatch",
            Self::Sqlite(_) => "sqlite",
            Self::Aborted { .. } => "aborted",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::ConfigParse(_) => "config_parse",
            Self::ConfigInvalid(_) => "config_invalid",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::Walk { .. } => "walk",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }

    /// Process exit code for this error.
    ///
    /// A declined prompt exits with 2 so scripts can tell it apart from a failure.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Aborted { .. } => 2,
            _ => 1,
        }
    }
}

/// Convenience type alias for Results using SwitchError.
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| SwitchError::Other(format!("{}: {e}", f().into())))
    }
}
