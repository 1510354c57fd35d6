//! Optional TOML configuration for koboswitch.
//!
//! Every key has a default matching stock Kobo firmware, so the file is only
//! needed for unusual devices or firmware that renames its database.
//!
//! # Example
//!
//! ```toml
//! private_dir = ".kobo"
//! database_name = "KoboReader.sqlite"
//! user_table = "user"
//! restore_ignore = [".kobo", ".kobo-images"]
//! preserve_symlinks = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::error::{Result, ResultExt, SwitchError};
use crate::replicate::IgnoreSet;

/// Default device-private folder name.
pub const DEFAULT_PRIVATE_DIR: &str = ".kobo";

/// Default metadata database file name.
pub const DEFAULT_DATABASE_NAME: &str = "KoboReader.sqlite";

/// Default account table name.
pub const DEFAULT_USER_TABLE: &str = "user";

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Device-private folder holding the database.
    pub private_dir: String,

    /// Database file name inside `private_dir`.
    pub database_name: String,

    /// Table holding the signed-in account.
    pub user_table: String,

    /// Glob patterns skipped when restoring the backup onto the device.
    pub restore_ignore: Vec<String>,

    /// Recreate symlinks instead of skipping them.
    pub preserve_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            private_dir: DEFAULT_PRIVATE_DIR.to_string(),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            user_table: DEFAULT_USER_TABLE.to_string(),
            restore_ignore: vec![DEFAULT_PRIVATE_DIR.to_string()],
            preserve_symlinks: true,
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from the default location if present.
    ///
    /// A missing default file yields [`Settings::default`]; a missing explicit
    /// file is an error.
    #[instrument(skip_all, fields(explicit = ?explicit.map(Path::display)))]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };

        let Some(path) = path else {
            debug!("No config directory on this platform, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            if required {
                return Err(SwitchError::ConfigNotFound { path });
            }
            trace!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let settings = Self::from_file(&path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    /// Parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents)
            .map_err(|e| match e {
                SwitchError::ConfigParse(msg) => {
                    SwitchError::ConfigParse(format!("{}: {msg}", path.display()))
                }
                other => other,
            })
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).map_err(|e| SwitchError::ConfigParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check names and patterns.
    pub fn validate(&self) -> Result<()> {
        validate_name("private_dir", &self.private_dir)?;
        validate_name("database_name", &self.database_name)?;

        if self.user_table.trim().is_empty() {
            return Err(SwitchError::ConfigInvalid(
                "user_table must not be empty".to_string(),
            ));
        }

        // Compiling reports the first bad pattern.
        self.restore_ignore_set()?;
        Ok(())
    }

    /// Compile `restore_ignore` into an [`IgnoreSet`].
    pub fn restore_ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::new(&self.restore_ignore)
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SwitchError::ConfigInvalid(format!("{field} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(SwitchError::ConfigInvalid(format!(
            "{field} must be a plain file name, got '{value}'"
        )));
    }
    Ok(())
}

/// Returns the default config file path.
///
/// Location: `<config dir>/koboswitch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("koboswitch").join("config.toml"))
}
