//! Runtime configuration loaded from the environment.
//!
//! `.env` files are honoured through `dotenvy`; real environment variables
//! win over `.env` entries.
//!
//! | Variable                  | Default                      |
//! |---------------------------|------------------------------|
//! | `KBNOTE_DB_PATH`          | `kbnote.sqlite3`             |
//! | `KBNOTE_SESSION_SECRET`   | required, >= 32 bytes        |
//! | `KBNOTE_SESSION_TTL_SECS` | `604800`                     |
//! | `KBNOTE_LOG_LEVEL`        | `debug` / `info` by build    |
//! | `KBNOTE_LOG_DIR`          | unset: file logging disabled |

use crate::auth::session::{DEFAULT_SESSION_TTL, MIN_SECRET_BYTES};
use crate::logging::default_log_level;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "KBNOTE_DB_PATH";
pub const ENV_SESSION_SECRET: &str = "KBNOTE_SESSION_SECRET";
pub const ENV_SESSION_TTL_SECS: &str = "KBNOTE_SESSION_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "KBNOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "KBNOTE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "kbnote.sqlite3";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("environment variable `{key}` is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_path", &self.db_path)
            .field("session_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));

        let session_secret =
            read(ENV_SESSION_SECRET).ok_or(ConfigError::Missing(ENV_SESSION_SECRET))?;
        if session_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::Invalid {
                key: ENV_SESSION_SECRET,
                message: format!("must be at least {MIN_SECRET_BYTES} bytes"),
            });
        }

        let session_ttl = match read(ENV_SESSION_TTL_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|err| ConfigError::Invalid {
                    key: ENV_SESSION_TTL_SECS,
                    message: err.to_string(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: ENV_SESSION_TTL_SECS,
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_SESSION_TTL,
        };

        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());

        let log_dir = match read(ENV_LOG_DIR).map(PathBuf::from) {
            Some(dir) if !dir.is_absolute() => {
                return Err(ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
            other => other,
        };

        Ok(Self {
            db_path,
            session_secret,
            session_ttl,
            log_level,
            log_dir,
        })
    }

    /// Session file used by command-line clients, stored next to the database.
    pub fn session_file(&self) -> PathBuf {
        let mut name = self
            .db_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_DB_FILE_NAME.into());
        name.push(".session");
        self.db_path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_LOG_DIR, ENV_SESSION_SECRET, ENV_SESSION_TTL_SECS};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[(ENV_SESSION_SECRET, SECRET)]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("kbnote.sqlite3"));
        assert_eq!(config.session_ttl, Duration::from_secs(604_800));
        assert!(config.log_dir.is_none());
        assert_eq!(config.session_file(), PathBuf::from("kbnote.sqlite3.session"));
    }

    #[test]
    fn secret_is_required_and_bounded() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing(ENV_SESSION_SECRET));
        assert!(matches!(
            load(&[(ENV_SESSION_SECRET, "short")]),
            Err(ConfigError::Invalid { key: ENV_SESSION_SECRET, .. })
        ));
    }

    #[test]
    fn invalid_ttl_and_relative_log_dir_are_rejected() {
        assert!(matches!(
            load(&[(ENV_SESSION_SECRET, SECRET), (ENV_SESSION_TTL_SECS, "soon")]),
            Err(ConfigError::Invalid { key: ENV_SESSION_TTL_SECS, .. })
        ));
        assert!(matches!(
            load(&[(ENV_SESSION_SECRET, SECRET), (ENV_SESSION_TTL_SECS, "0")]),
            Err(ConfigError::Invalid { key: ENV_SESSION_TTL_SECS, .. })
        ));
        assert!(matches!(
            load(&[(ENV_SESSION_SECRET, SECRET), (ENV_LOG_DIR, "logs")]),
            Err(ConfigError::Invalid { key: ENV_LOG_DIR, .. })
        ));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = load(&[(ENV_SESSION_SECRET, SECRET)]).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }
}
