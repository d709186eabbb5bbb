//! Runtime configuration for the watch primitive.
//!
//! [`WatchConfig`] is not part of the user-facing settings object. It tunes
//! how the file-system watcher behaves and is derived from the resolved
//! settings (`persistent` mirrors `watchMode`).

use serde::{Deserialize, Serialize};

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use tw_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// assert!(config.persistent);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Coalescing window in milliseconds.
    ///
    /// Several notifications for the same path inside this window are
    /// reported once.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Keep watching after the initial scan.
    ///
    /// When `false` the watcher reports existing files, signals readiness and
    /// closes its channel.
    pub persistent: bool,
}

impl WatchConfig {
    /// Returns a config for a one-shot scan that stops after reporting
    /// existing files.
    #[must_use]
    pub fn one_shot() -> Self {
        Self {
            persistent: false,
            ..Self::default()
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
            persistent: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.debounce_ms, 100);
        assert!(config.recursive);
        assert!(config.persistent);
    }

    #[test]
    fn test_one_shot() {
        let config = WatchConfig::one_shot();
        assert!(!config.persistent);
        assert_eq!(config.debounce_ms, 100);
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let config: WatchConfig = serde_json::from_str(r#"{"debounce_ms": 25}"#).unwrap();
        assert_eq!(config.debounce_ms, 25);
        assert!(config.recursive);
        assert!(config.persistent);
    }
}
