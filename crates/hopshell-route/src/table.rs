//! Route table loading and validation

use std::fmt;
use std::path::Path;

use hopshell_exec::Chain;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cidr::CidrBlock;
use crate::error::RouteError;

/// What a route applies to, decided once at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSelector {
    /// Targets inside this block
    Cidr(CidrBlock),
    /// `"direct"`: informational entry, never a match candidate
    Direct,
    /// `"default"`: fallback when no CIDR route matches
    Default,
}

impl NetworkSelector {
    /// Parse a `network` value
    ///
    /// # Errors
    /// Returns `RouteError::InvalidSelector` if the value is neither a sentinel
    /// nor a valid CIDR block
    pub fn parse(value: &str) -> Result<Self, RouteError> {
        match value.trim() {
            "default" => Ok(NetworkSelector::Default),
            "direct" => Ok(NetworkSelector::Direct),
            other => CidrBlock::parse(other).map(NetworkSelector::Cidr),
        }
    }
}

impl fmt::Display for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkSelector::Cidr(block) => block.fmt(f),
            NetworkSelector::Direct => f.write_str("direct"),
            NetworkSelector::Default => f.write_str("default"),
        }
    }
}

/// One routing rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Which targets this route covers
    pub selector: NetworkSelector,
    /// Relay chain to reach them
    pub via: Chain,
    /// Free-form note shown in list mode
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    network: String,
    via: Chain,
    #[serde(default)]
    description: Option<String>,
}

/// Ordered routing rules; order is significant (first match wins)
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table from already-validated routes
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Load and validate a JSON route file
    ///
    /// # Errors
    /// Returns `RouteError::Config` if the file is missing, not JSON, lacks
    /// the `routes` array, or any entry is invalid. No partial table is
    /// ever returned.
    pub fn load(path: &Path) -> Result<Self, RouteError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RouteError::Config(format!("routes file not found: {}", path.display()))
            } else {
                RouteError::Config(format!("cannot read {}: {e}", path.display()))
            }
        })?;

        let table = Self::from_json_str(&content).map_err(|e| match e {
            RouteError::Config(msg) => RouteError::Config(format!("{}: {msg}", path.display())),
            other => RouteError::Config(format!("{}: {other}", path.display())),
        })?;

        info!(path = %path.display(), routes = table.len(), "loaded route table");
        Ok(table)
    }

    /// Parse and validate a JSON route document
    ///
    /// # Errors
    /// See [`RouteTable::load`]
    pub fn from_json_str(content: &str) -> Result<Self, RouteError> {
        let doc: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| RouteError::Config(format!("invalid JSON: {e}")))?;

        let raw_routes = doc
            .get("routes")
            .ok_or_else(|| RouteError::Config("'routes' key not found".to_string()))?;
        if !raw_routes.is_array() {
            return Err(RouteError::Config("'routes' must be an array".to_string()));
        }

        let raw: Vec<RawRoute> = serde_json::from_value(raw_routes.clone())
            .map_err(|e| RouteError::Config(format!("invalid route entry: {e}")))?;

        let mut routes = Vec::with_capacity(raw.len());
        let mut default_seen = None;

        for (idx, entry) in raw.into_iter().enumerate() {
            let selector = NetworkSelector::parse(&entry.network)
                .map_err(|e| RouteError::Config(format!("route {}: {e}", idx + 1)))?;

            if selector == NetworkSelector::Default {
                if let Some(previous) = default_seen {
                    warn!(
                        previous = previous,
                        current = idx + 1,
                        "multiple default routes, the last one wins"
                    );
                }
                default_seen = Some(idx + 1);
            }

            debug!(index = idx + 1, network = %selector, via = %entry.via, "route");

            routes.push(Route {
                selector,
                via: entry.via,
                description: entry.description.filter(|d| !d.is_empty()),
            });
        }

        Ok(Self { routes })
    }

    /// Routes in declared order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
