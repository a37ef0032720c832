//! Error types for hopshell-route

use thiserror::Error;

/// Errors raised before any network action is taken
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Route source missing, unparseable, or structurally invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// No CIDR route matched and no default route exists
    #[error("no route found for {target}")]
    NotFound {
        /// Resolved target address (or hostname when resolution failed)
        target: String,
    },

    /// Malformed network selector
    #[error("invalid network '{network}': {reason}")]
    InvalidSelector {
        /// Selector as written
        network: String,
        /// Why it was rejected
        reason: String,
    },
}

impl RouteError {
    /// Whether the error comes from the route source rather than a lookup
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, RouteError::Config(_) | RouteError::InvalidSelector { .. })
    }
}
