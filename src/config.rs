//! Purpose: Resolve runtime settings shared by the CLI and library callers.
//! Exports: `resolve_db_path`, `resolve_log_filter`, and their env var names.
//! Role: One place for flag > env > default precedence.
//! Invariants: Default database stays `users.db` in the working directory.
//! Invariants: Empty flag or env values count as unset.

use std::ffi::OsString;
use std::path::PathBuf;

pub const DB_ENV: &str = "SQLSCOPE_DB";
pub const LOG_ENV: &str = "SQLSCOPE_LOG";
pub const DEFAULT_DB: &str = "users.db";
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    resolve_db_path_with(flag, std::env::var_os(DB_ENV))
}

pub fn resolve_log_filter(flag: Option<String>) -> String {
    resolve_log_filter_with(flag, std::env::var(LOG_ENV).ok())
}

fn resolve_db_path_with(flag: Option<PathBuf>, env: Option<OsString>) -> PathBuf {
    flag.filter(|path| !path.as_os_str().is_empty())
        .or_else(|| env.filter(|value| !value.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn resolve_log_filter_with(flag: Option<String>, env: Option<String>) -> String {
    flag.filter(|value| !value.trim().is_empty())
        .or_else(|| env.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DB, resolve_db_path_with, resolve_log_filter_with};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn flag_beats_env() {
        let path = resolve_db_path_with(
            Some(PathBuf::from("flag.db")),
            Some(OsString::from("env.db")),
        );
        assert_eq!(path, PathBuf::from("flag.db"));
    }

    #[test]
    fn env_beats_default() {
        let path = resolve_db_path_with(None, Some(OsString::from("env.db")));
        assert_eq!(path, PathBuf::from("env.db"));
    }

    #[test]
    fn empty_values_fall_through_to_default() {
        let path = resolve_db_path_with(Some(PathBuf::new()), Some(OsString::new()));
        assert_eq!(path, PathBuf::from(DEFAULT_DB));
    }

    #[test]
    fn log_filter_precedence() {
        assert_eq!(resolve_log_filter_with(None, None), "warn");
        assert_eq!(
            resolve_log_filter_with(None, Some("debug".to_string())),
            "debug"
        );
        assert_eq!(
            resolve_log_filter_with(Some("info".to_string()), Some("debug".to_string())),
            "info"
        );
    }
}
