//! Run-scoped caches shared by concurrently generated projects.
//!
//! Values are computed outside the map and inserted with insert-if-absent:
//! two projects computing the same key both do the work, the first insert
//! wins, and every caller sees that value.

use dashmap::DashMap;

use crate::core::solution::ConfId;
use crate::core::target::DevEnv;
use crate::util::config::{Config, DEFAULT_WINDOWS_SDK_VERSION};

/// Caches living for one generation run.
#[derive(Debug, Default)]
pub struct GenerationCache {
    command_lines: DashMap<(ConfId, bool), String>,
    platform_versions: DashMap<DevEnv, String>,
}

impl GenerationCache {
    pub fn new() -> Self {
        GenerationCache::default()
    }

    /// Cached value for `key`, or `compute()` inserted if still absent.
    fn get_or_insert<K, F>(map: &DashMap<K, String>, key: K, compute: F) -> String
    where
        K: std::hash::Hash + Eq,
        F: FnOnce() -> String,
    {
        if let Some(hit) = map.get(&key) {
            return hit.clone();
        }
        let value = compute();
        map.entry(key).or_insert(value).clone()
    }

    /// fbuild command line of a configuration.
    pub fn command_line<F>(&self, conf: ConfId, rebuild: bool, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        Self::get_or_insert(&self.command_lines, (conf, rebuild), compute)
    }

    /// Windows SDK version used for `dev_env`.
    pub fn platform_version(&self, dev_env: DevEnv, config: &Config) -> String {
        Self::get_or_insert(&self.platform_versions, dev_env, || {
            config
                .sdk
                .windows_sdk_versions
                .get(&dev_env.to_string())
                .cloned()
                .unwrap_or_else(|| DEFAULT_WINDOWS_SDK_VERSION.to_string())
        })
    }

    pub fn cached_command_lines(&self) -> usize {
        self.command_lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_first_writer_wins() {
        let cache = GenerationCache::new();
        let first = cache.command_line(ConfId(0), false, || "fbuild A".to_string());
        let second = cache.command_line(ConfId(0), false, || "fbuild B".to_string());
        assert_eq!(first, "fbuild A");
        assert_eq!(second, "fbuild A");

        let rebuild = cache.command_line(ConfId(0), true, || "fbuild -clean A".to_string());
        assert_eq!(rebuild, "fbuild -clean A");
        assert_eq!(cache.cached_command_lines(), 2);
    }

    #[test]
    fn test_concurrent_writers_agree() {
        let cache = GenerationCache::new();
        let computed = AtomicUsize::new(0);

        let results: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let cache = &cache;
                    let computed = &computed;
                    s.spawn(move || {
                        cache.command_line(ConfId(7), false, || {
                            computed.fetch_add(1, Ordering::SeqCst);
                            format!("fbuild writer{}", i)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(computed.load(Ordering::SeqCst) >= 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_platform_version_from_config() {
        let mut config = Config::default();
        config
            .sdk
            .windows_sdk_versions
            .insert("vs2019".to_string(), "10.0.18362.0".to_string());

        let cache = GenerationCache::new();
        assert_eq!(cache.platform_version(DevEnv::VS2019, &config), "10.0.18362.0");
        assert_eq!(
            cache.platform_version(DevEnv::VS2022, &config),
            DEFAULT_WINDOWS_SDK_VERSION
        );
    }
}
