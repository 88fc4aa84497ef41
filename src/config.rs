// Configuration - storage selection, read once at process start
//
// HBNB_TYPE_STORAGE  "db" selects the relational backend, anything else the JSON file
// HBNB_FILE_PATH     JSON document path (file backend)
// HBNB_DB_PATH       SQLite database path (db backend)
// HBNB_ENV           "test" drops every table on the db backend's first reload

use std::path::PathBuf;

use clap::Args;

pub const DEFAULT_FILE_PATH: &str = "file.json";
pub const DEFAULT_DB_PATH: &str = "hbnb.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Db,
}

impl StorageKind {
    /// Only the exact value `db` selects the database
    pub fn from_selector(value: &str) -> Self {
        if value == "db" {
            StorageKind::Db
        } else {
            StorageKind::File
        }
    }
}

fn parse_kind(value: &str) -> Result<StorageKind, std::convert::Infallible> {
    Ok(StorageKind::from_selector(value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub file_path: PathBuf,
    pub db_path: PathBuf,
    pub drop_on_reload: bool,
}

impl StorageConfig {
    /// File backend at the given path
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StorageConfig {
            kind: StorageKind::File,
            file_path: path.into(),
            ..Self::default()
        }
    }

    /// Database backend at the given path
    pub fn db(path: impl Into<PathBuf>) -> Self {
        StorageConfig {
            kind: StorageKind::Db,
            db_path: path.into(),
            ..Self::default()
        }
    }

    /// Build from any variable lookup, process environment or otherwise
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        StorageConfig {
            kind: lookup("HBNB_TYPE_STORAGE")
                .map(|v| StorageKind::from_selector(&v))
                .unwrap_or(defaults.kind),
            file_path: lookup("HBNB_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            db_path: lookup("HBNB_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            drop_on_reload: lookup("HBNB_ENV").as_deref() == Some("test"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            kind: StorageKind::File,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            drop_on_reload: false,
        }
    }
}

/// Storage flags shared by both binaries, each falling back to its variable
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Backend: "db" for SQLite, anything else for the JSON file
    #[arg(long = "storage", env = "HBNB_TYPE_STORAGE", value_parser = parse_kind, default_value = "file")]
    pub kind: StorageKind,

    /// JSON document used by the file backend
    #[arg(long = "file", env = "HBNB_FILE_PATH", default_value = DEFAULT_FILE_PATH)]
    pub file_path: PathBuf,

    /// SQLite database used by the db backend
    #[arg(long = "db", env = "HBNB_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Environment name; "test" drops every table on the first reload
    #[arg(long = "env", env = "HBNB_ENV")]
    pub env: Option<String>,
}

impl From<StorageArgs> for StorageConfig {
    fn from(args: StorageArgs) -> Self {
        StorageConfig {
            kind: args.kind,
            file_path: args.file_path,
            db_path: args.db_path,
            drop_on_reload: args.env.as_deref() == Some("test"),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
