use crate::consts::{APP_NAME, REPOSITORY_ENV};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Returns the local artifact repository.
///
/// `KILN_REPOSITORY` takes precedence over the cache directory.
pub fn repository_dir() -> PathBuf {
  match std::env::var(REPOSITORY_ENV) {
    Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
    _ => cache_dir().join("repository"),
  }
}

/// Returns the default configuration file.
pub fn config_file() -> PathBuf {
  config_dir().join("config.json")
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_cache_home_takes_precedence() {
    temp_env::with_vars(
      [
        ("XDG_CACHE_HOME", Some("/custom/cache")),
        ("HOME", Some("/home/user")),
        (REPOSITORY_ENV, None),
      ],
      || {
        assert_eq!(cache_dir(), PathBuf::from("/custom/cache").join(APP_NAME));
        assert_eq!(
          repository_dir(),
          PathBuf::from("/custom/cache").join(APP_NAME).join("repository")
        );
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_CACHE_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), PathBuf::from("/home/user/.config").join(APP_NAME));
        assert_eq!(cache_dir(), PathBuf::from("/home/user/.cache").join(APP_NAME));
        assert_eq!(config_file(), PathBuf::from("/home/user/.config/kiln/config.json"));
      },
    );
  }

  #[test]
  #[serial]
  fn repository_env_overrides_cache() {
    temp_env::with_vars(
      [(REPOSITORY_ENV, Some("/srv/repo")), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(repository_dir(), PathBuf::from("/srv/repo"));
      },
    );
  }
}
