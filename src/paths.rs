//! Path resolution for arx
//!
//! # Environment Variables
//!
//! - `ARX_TMPDIR` - Parent directory for per-entry cache directories
//!   (default: the system temporary directory). `~` and `$VAR` are expanded.

use std::path::PathBuf;

/// Environment variable for the cache directory root
pub const ENV_TMPDIR: &str = "ARX_TMPDIR";

/// Where per-entry cache directories are created, when overridden.
pub fn cache_root() -> Option<PathBuf> {
    let dir = std::env::var(ENV_TMPDIR).ok().filter(|d| !d.is_empty())?;
    let path = expand(&dir);
    log::debug!("Using cache root from {}: {}", ENV_TMPDIR, path.display());
    Some(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the string unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, PoisonError};

    /// Held while a test changes the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var. Callers are
    /// serialized through `ENV_LOCK`; no other test in this crate reads the
    /// variables it sets.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let original = env::var(key).ok();
        // SAFETY: ENV_LOCK serializes every test that mutates the environment
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_cache_root_env_override() {
        with_env_var(ENV_TMPDIR, "/custom/tmp", || {
            assert_eq!(cache_root(), Some(PathBuf::from("/custom/tmp")));
        });
    }

    #[test]
    fn test_cache_root_empty_is_unset() {
        with_env_var(ENV_TMPDIR, "", || {
            assert_eq!(cache_root(), None);
        });
    }

    #[test]
    fn test_cache_root_overrides_do_not_interleave() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let dir = format!("/tmp/arx-{i}");
                    with_env_var(ENV_TMPDIR, &dir, || {
                        std::thread::yield_now();
                        cache_root() == Some(PathBuf::from(&dir))
                    })
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_expand_with_tilde() {
        let Ok(home) = env::var("HOME") else {
            return;
        };
        assert_eq!(expand("~/test/path"), PathBuf::from(home).join("test/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("ARX_TEST_VAR", "test_value", || {
            let result = expand("/path/$ARX_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
