//! Agent pool discovery.
//!
//! Every call re-resolves the pool so that scale-up and scale-down are picked
//! up on the next coordination cycle without any invalidation protocol.

use async_trait::async_trait;

use crate::error::ResolveError;

/// A single agent endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentAddr {
    pub host: String,
    pub port: u16,
}

impl AgentAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL for HTTP requests to this agent.
    pub fn base_url(&self) -> String {
        format!("http://{self}")
    }
}

impl std::fmt::Display for AgentAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl std::str::FromStr for AgentAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("missing port in agent address '{s}'"))?;
        let port = port
            .parse()
            .map_err(|e| format!("invalid port in agent address '{s}': {e}"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(format!("missing host in agent address '{s}'"));
        }
        Ok(Self::new(host, port))
    }
}

/// Resolves the agent pool into its current member addresses.
#[async_trait]
pub trait PoolResolver: Send + Sync {
    /// Logical name of the pool, for diagnostics.
    fn pool_name(&self) -> &str;

    /// Current pool members, ordered and de-duplicated.
    ///
    /// Fails with [`ResolveError::NoWorkersAvailable`] when the pool resolves
    /// to nothing.
    async fn resolve_headless_service(&self) -> Result<Vec<AgentAddr>, ResolveError>;
}

/// Resolves a headless service name through the system resolver; every
/// backing pod contributes one address.
#[derive(Debug, Clone)]
pub struct DnsPoolResolver {
    service_name: String,
    port: u16,
}

impl DnsPoolResolver {
    pub fn new(service_name: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            port,
        }
    }
}

#[async_trait]
impl PoolResolver for DnsPoolResolver {
    fn pool_name(&self) -> &str {
        &self.service_name
    }

    async fn resolve_headless_service(&self) -> Result<Vec<AgentAddr>, ResolveError> {
        let resolved = tokio::net::lookup_host((self.service_name.as_str(), self.port))
            .await
            .map_err(|e| ResolveError::ResolutionFailed {
                pool: self.service_name.clone(),
                reason: e.to_string(),
            })?;

        let addrs = normalize(
            resolved
                .map(|sock| AgentAddr::new(sock.ip().to_string(), self.port))
                .collect(),
        );

        if addrs.is_empty() {
            return Err(ResolveError::NoWorkersAvailable {
                pool: self.service_name.clone(),
            });
        }

        tracing::debug!(pool = %self.service_name, agents = addrs.len(), "Resolved agent pool");
        Ok(addrs)
    }
}

/// Fixed member list, for tests and statically configured pools.
#[derive(Debug, Clone)]
pub struct StaticPoolResolver {
    name: String,
    addrs: Vec<AgentAddr>,
}

impl StaticPoolResolver {
    pub fn new(addrs: Vec<AgentAddr>) -> Self {
        Self {
            name: "static".to_string(),
            addrs: normalize(addrs),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl PoolResolver for StaticPoolResolver {
    fn pool_name(&self) -> &str {
        &self.name
    }

    async fn resolve_headless_service(&self) -> Result<Vec<AgentAddr>, ResolveError> {
        if self.addrs.is_empty() {
            return Err(ResolveError::NoWorkersAvailable {
                pool: self.name.clone(),
            });
        }
        Ok(self.addrs.clone())
    }
}

fn normalize(mut addrs: Vec<AgentAddr>) -> Vec<AgentAddr> {
    addrs.sort();
    addrs.dedup();
    addrs
}
