//! First-hop reachability probes for list mode

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hopshell_exec::{Chain, HostSpec, SshCommandBuilder, Transport};
use hopshell_route::Route;
use tracing::{debug, instrument};

/// `ConnectTimeout` used by probes
pub const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of probing a route's first hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Route needs no relay, nothing to probe
    Direct,
    /// `echo ok` succeeded on the first hop
    Reachable,
    /// Probe failed, timed out, or the hop was malformed
    Unreachable(String),
}

impl ProbeStatus {
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeStatus::Reachable)
    }
}

/// Probes the first hop of each route directly (no relay)
pub struct RouteProber {
    transport: Arc<dyn Transport>,
    identity: Option<PathBuf>,
    timeout: Duration,
}

impl RouteProber {
    /// Create a prober bounded by `timeout` per hop
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            identity: None,
            timeout,
        }
    }

    /// Pass an identity file to the probes
    #[must_use]
    pub fn with_identity(mut self, identity: Option<PathBuf>) -> Self {
        self.identity = identity;
        self
    }

    /// Probe a route's first hop
    #[instrument(skip(self, route), fields(via = %route.via))]
    pub async fn probe(&self, route: &Route) -> ProbeStatus {
        let Some(first_hop) = route.via.first_hop() else {
            return ProbeStatus::Direct;
        };

        let hop = match HostSpec::parse(first_hop) {
            Ok(hop) => hop,
            Err(e) => return ProbeStatus::Unreachable(e.to_string()),
        };

        let cmd = SshCommandBuilder::new(Chain::Direct)
            .with_identity_opt(self.identity.clone())
            .with_connect_timeout(PROBE_CONNECT_TIMEOUT)
            .ssh(&hop, "echo ok");

        let status = match self.transport.run_with_timeout(&cmd, self.timeout).await {
            Ok(result) if result.success() => ProbeStatus::Reachable,
            Ok(result) => ProbeStatus::Unreachable(format!("exit status {}", result.status)),
            Err(e) => ProbeStatus::Unreachable(e.to_string()),
        };

        debug!(hop = %first_hop, status = ?status, "probed first hop");
        status
    }
}
