use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Access level granted to callers. Fixed when the database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionMode {
    #[default]
    #[serde(rename = "r")]
    ReadOnly,
    #[serde(rename = "w")]
    ReadWrite,
}

impl PermissionMode {
    pub fn allows_writes(self) -> bool {
        self == PermissionMode::ReadWrite
    }
}

impl FromStr for PermissionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" | "read" => Ok(PermissionMode::ReadOnly),
            "w" | "rw" | "write" => Ok(PermissionMode::ReadWrite),
            other => Err(Error::Config(format!(
                "unknown permission \"{other}\", expected r or w"
            ))),
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionMode::ReadOnly => f.write_str("r"),
            PermissionMode::ReadWrite => f.write_str("w"),
        }
    }
}

/// Database options.
///
/// Loadable from TOML; every field has a default, so an empty file is valid:
///
/// ```toml
/// root_dir = "/var/lib/pddb"
/// permissions = "w"
///
/// [table_permissions]
/// audit = "r"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Directory that holds one sub-directory per database.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Permission for tables without an override.
    #[serde(default)]
    pub permissions: PermissionMode,

    /// Per-table overrides, keyed by table name.
    #[serde(default)]
    pub table_permissions: HashMap<String, PermissionMode>,

    /// Write snapshots to disk. When false the database lives in memory only.
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// Load every existing snapshot when the database is opened.
    #[serde(default = "default_true")]
    pub auto_load: bool,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for Options {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            permissions: PermissionMode::default(),
            table_permissions: HashMap::new(),
            persistent: true,
            auto_load: true,
        }
    }
}

impl Options {
    /// Read-write options rooted at `dir`.
    pub fn writable(dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: dir.into(),
            permissions: PermissionMode::ReadWrite,
            ..Default::default()
        }
    }

    /// Read-write, nothing touches disk.
    pub fn in_memory() -> Self {
        Self {
            permissions: PermissionMode::ReadWrite,
            persistent: false,
            auto_load: false,
            ..Default::default()
        }
    }

    pub fn with_permissions(mut self, mode: PermissionMode) -> Self {
        self.permissions = mode;
        self
    }

    pub fn with_table_permission(mut self, table: &str, mode: PermissionMode) -> Self {
        self.table_permissions.insert(table.to_ascii_lowercase(), mode);
        self
    }

    /// Effective permission for a (normalized) table name.
    pub fn permission_for(&self, table: &str) -> PermissionMode {
        self.table_permissions
            .get(table)
            .copied()
            .unwrap_or(self.permissions)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let opts = Options::from_toml("").unwrap();
        assert_eq!(opts.permissions, PermissionMode::ReadOnly);
        assert!(opts.persistent);
        assert!(opts.auto_load);
        assert_eq!(opts.root_dir, PathBuf::from("."));
    }

    #[test]
    fn toml_table_overrides() {
        let opts = Options::from_toml(
            r#"
            root_dir = "/tmp/x"
            permissions = "w"

            [table_permissions]
            audit = "r"
            "#,
        )
        .unwrap();
        assert_eq!(opts.permission_for("people"), PermissionMode::ReadWrite);
        assert_eq!(opts.permission_for("audit"), PermissionMode::ReadOnly);
    }

    #[test]
    fn bad_permission_is_config_error() {
        assert!(matches!(
            Options::from_toml(r#"permissions = "x""#),
            Err(Error::Config(_))
        ));
        assert!("x".parse::<PermissionMode>().is_err());
        assert_eq!("w".parse::<PermissionMode>().unwrap(), PermissionMode::ReadWrite);
    }
}
