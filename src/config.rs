//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Logical name of the agent pool.
pub const AGENT_POOL_NAME: &str = "tarasque-agent";

/// Cluster DNS name of the headless agent service.
pub const DEFAULT_AGENT_SERVICE_NAME: &str = "tarasque-agent.tarasque.svc.cluster.local";

/// Port agents listen on.
pub const DEFAULT_AGENT_PORT: u16 = 8888;

/// Coordinator configuration, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Logical pool name used in logs.
    pub pool_name: String,
    /// DNS name resolving to every agent instance.
    pub service_name: String,
    /// Port agents listen on.
    pub agent_port: u16,
    /// Per-request timeout (transport default when unset).
    pub request_timeout: Option<Duration>,
    /// Interval between reconcile cycles.
    pub reconcile_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pool_name: AGENT_POOL_NAME.to_string(),
            service_name: DEFAULT_AGENT_SERVICE_NAME.to_string(),
            agent_port: DEFAULT_AGENT_PORT,
            request_timeout: None,
            reconcile_interval: Duration::from_secs(10),
        }
    }
}

impl CoordinatorConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let service_name = lookup("AGENT_SERVICE_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.service_name);

        let agent_port = match lookup("AGENT_SERVICE_PORT") {
            Some(raw) => parse_value("AGENT_SERVICE_PORT", &raw)?,
            None => defaults.agent_port,
        };

        let request_timeout = match lookup("AGENT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value(
                "AGENT_REQUEST_TIMEOUT_SECS",
                &raw,
            )?)),
            None => None,
        };

        let reconcile_interval = match lookup("RECONCILE_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = parse_value("RECONCILE_INTERVAL_SECS", &raw)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "RECONCILE_INTERVAL_SECS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.reconcile_interval,
        };

        Ok(Self {
            pool_name: defaults.pool_name,
            service_name,
            agent_port,
            request_timeout,
            reconcile_interval,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = CoordinatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.service_name, DEFAULT_AGENT_SERVICE_NAME);
        assert_eq!(config.agent_port, 8888);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn overrides_from_environment() {
        let config = CoordinatorConfig::from_lookup(lookup(&[
            ("AGENT_SERVICE_NAME", "agents.bench.svc"),
            ("AGENT_SERVICE_PORT", "9090"),
            ("AGENT_REQUEST_TIMEOUT_SECS", "30"),
            ("RECONCILE_INTERVAL_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.service_name, "agents.bench.svc");
        assert_eq!(config.agent_port, 9090);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.reconcile_interval, Duration::from_secs(5));
        assert_eq!(config.pool_name, AGENT_POOL_NAME);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = CoordinatorConfig::from_lookup(lookup(&[("AGENT_SERVICE_PORT", "eighty")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "AGENT_SERVICE_PORT")
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = CoordinatorConfig::from_lookup(lookup(&[("RECONCILE_INTERVAL_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn blank_service_name_falls_back_to_default() {
        let config = CoordinatorConfig::from_lookup(lookup(&[("AGENT_SERVICE_NAME", "  ")])).unwrap();
        assert_eq!(config.service_name, DEFAULT_AGENT_SERVICE_NAME);
    }
}
