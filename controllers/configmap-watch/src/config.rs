//! Controller configuration.
//!
//! Loaded from environment variables:
//! - `KUBECONFIG_PATH`: kubeconfig file (default: in-cluster or `KUBECONFIG`)
//! - `WATCH_NAMESPACE`: restrict watches to one namespace (default: all)
//! - `CACHE_SYNC_TIMEOUT_SECS`: initial sync deadline (default: 300)
//! - `RESYNC_PERIOD_SECS`: periodic resync interval, 0 disables (default: 600)

use crate::error::ControllerError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_SYNC_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RESYNC_PERIOD_SECS: u64 = 600;

/// Runtime configuration for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Explicit kubeconfig path
    pub kubeconfig: Option<PathBuf>,
    /// Namespace to watch, `None` for all namespaces
    pub namespace: Option<String>,
    /// How long to wait for both caches to sync
    pub cache_sync_timeout: Duration,
    /// Resync interval, `None` when disabled
    pub resync_period: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespace: None,
            cache_sync_timeout: Duration::from_secs(DEFAULT_CACHE_SYNC_TIMEOUT_SECS),
            resync_period: Some(Duration::from_secs(DEFAULT_RESYNC_PERIOD_SECS)),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let cache_sync_secs = parse_secs(
            "CACHE_SYNC_TIMEOUT_SECS",
            non_empty("CACHE_SYNC_TIMEOUT_SECS"),
            DEFAULT_CACHE_SYNC_TIMEOUT_SECS,
        )?;
        if cache_sync_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "CACHE_SYNC_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let resync_secs = parse_secs(
            "RESYNC_PERIOD_SECS",
            non_empty("RESYNC_PERIOD_SECS"),
            DEFAULT_RESYNC_PERIOD_SECS,
        )?;

        Ok(Self {
            kubeconfig: non_empty("KUBECONFIG_PATH").map(PathBuf::from),
            namespace: non_empty("WATCH_NAMESPACE"),
            cache_sync_timeout: Duration::from_secs(cache_sync_secs),
            resync_period: (resync_secs > 0).then(|| Duration::from_secs(resync_secs)),
        })
    }
}

fn parse_secs(name: &str, raw: Option<String>, default: u64) -> Result<u64, ControllerError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|e| {
            ControllerError::InvalidConfig(format!(
                "{name} must be a number of seconds, got {value:?}: {e}"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.cache_sync_timeout, Duration::from_secs(300));
        assert_eq!(config.resync_period, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("KUBECONFIG_PATH", "/tmp/kubeconfig"),
            ("WATCH_NAMESPACE", "team-a"),
            ("CACHE_SYNC_TIMEOUT_SECS", "30"),
            ("RESYNC_PERIOD_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(config.namespace.as_deref(), Some("team-a"));
        assert_eq!(config.cache_sync_timeout, Duration::from_secs(30));
        assert_eq!(config.resync_period, None);
    }

    #[test]
    fn test_blank_namespace_means_all() {
        let config = load(&[("WATCH_NAMESPACE", "  ")]).unwrap();
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = load(&[("RESYNC_PERIOD_SECS", "ten")]).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::InvalidConfig(msg) if msg.contains("RESYNC_PERIOD_SECS")
        ));
    }

    #[test]
    fn test_zero_sync_timeout_is_rejected() {
        let err = load(&[("CACHE_SYNC_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }
}
