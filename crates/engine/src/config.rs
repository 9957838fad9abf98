//! Engine configuration

use draftdb_concurrency::LockConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Tuning knobs for a [`crate::DocumentStore`]
///
/// The defaults suit interactive collaborative editing; everything is
/// overridable before `open`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache entry lifetime (default five minutes)
    pub cache_ttl: Duration,
    /// Lock manager settings (TTLs, deadlock threshold)
    pub lock: LockConfig,
    /// Directory for backup bundles; `None` disables backups
    pub backup_dir: Option<PathBuf>,
    /// Bounded capacity of each event subscriber's queue
    pub event_capacity: usize,
    /// Versions always retained by `cleanup_versions`
    pub keep_versions: usize,
    /// Retention window in days for `cleanup_versions`
    pub keep_days: u64,
    /// Backups retained per document by backup pruning
    pub keep_backups: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_ttl: Duration::from_secs(300),
            lock: LockConfig::default(),
            backup_dir: None,
            event_capacity: 256,
            keep_versions: 50,
            keep_days: 90,
            keep_backups: 10,
        }
    }
}

impl EngineConfig {
    /// Enable backups under `dir`
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Override the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the lock settings
    pub fn with_lock_config(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.backup_dir.is_none());
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_backup_dir("/tmp/backups")
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(config.backup_dir.as_deref().unwrap().to_str(), Some("/tmp/backups"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }
}
