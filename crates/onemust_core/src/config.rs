//! Store location configuration.
//!
//! # Responsibility
//! - Resolve local and shared store paths from the environment.
//! - Name the single App Group container both processes share.
//!
//! # Invariants
//! - Blank environment values fall back to defaults.
//! - The shared store can be disabled to exercise degraded mode.

use std::path::PathBuf;

/// App Group container shared by the main app and the widget extension.
pub const SHARED_CONTAINER_ID: &str = "group.com.pabloserrano.onemust";

pub const LOCAL_DB_PATH_ENV: &str = "ONEMUST_DB_PATH";
pub const SHARED_DB_PATH_ENV: &str = "ONEMUST_SHARED_DB_PATH";
pub const SHARED_DISABLED_ENV: &str = "ONEMUST_SHARED_DISABLED";

const LOCAL_DB_FILE_NAME: &str = "onemust_local.sqlite3";
const SHARED_DB_FILE_NAME: &str = "onemust_shared.sqlite3";

/// Where the two store areas live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub local_db_path: PathBuf,
    /// `None` when the shared container is unavailable.
    pub shared_db_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolves paths from `ONEMUST_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves paths with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let local_db_path = non_blank(LOCAL_DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(LOCAL_DB_FILE_NAME));

        let shared_disabled = non_blank(SHARED_DISABLED_ENV)
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let shared_db_path = if shared_disabled {
            None
        } else {
            Some(
                non_blank(SHARED_DB_PATH_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_shared_db_path),
            )
        };

        Self {
            local_db_path,
            shared_db_path,
        }
    }
}

fn default_shared_db_path() -> PathBuf {
    std::env::temp_dir()
        .join(SHARED_CONTAINER_ID)
        .join(SHARED_DB_FILE_NAME)
}
