//! Relay chain selection

use std::net::IpAddr;

use hopshell_exec::Chain;
use tracing::{debug, instrument};

use crate::error::RouteError;
use crate::table::{NetworkSelector, Route, RouteTable};

/// Which route produced the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    /// A CIDR route contained the target; `index` is zero-based
    Cidr { index: usize, route: &'a Route },
    /// No CIDR route matched; the last declared default was used
    Default { index: usize, route: &'a Route },
}

impl RouteMatch<'_> {
    /// Chain to use
    #[must_use]
    pub fn chain(&self) -> &Chain {
        match self {
            RouteMatch::Cidr { route, .. } | RouteMatch::Default { route, .. } => &route.via,
        }
    }

    /// Whether the fallback was taken
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, RouteMatch::Default { .. })
    }
}

/// Picks the relay chain for a target.
///
/// Routes are scanned in declared order and the first CIDR block containing
/// the target wins. There is no longest-prefix tie-break: with overlapping
/// blocks the earlier entry is used even if a later one is more specific.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteResolver;

impl RouteResolver {
    /// Create a resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Chain for `target_ip`
    ///
    /// # Errors
    /// Returns `RouteError::NotFound` when nothing matches and the table has
    /// no default route
    pub fn resolve(&self, target_ip: &str, table: &RouteTable) -> Result<Chain, RouteError> {
        self.resolve_match(target_ip, table)
            .map(|m| m.chain().clone())
    }

    /// Like [`RouteResolver::resolve`], reporting which route matched
    ///
    /// # Errors
    /// Returns `RouteError::NotFound` when nothing matches and the table has
    /// no default route
    #[instrument(skip(self, table), level = "debug")]
    pub fn resolve_match<'a>(
        &self,
        target_ip: &str,
        table: &'a RouteTable,
    ) -> Result<RouteMatch<'a>, RouteError> {
        // a hostname that failed to resolve can only ever hit the default
        let ip: Option<IpAddr> = target_ip.parse().ok();
        let mut fallback = None;

        for (index, route) in table.routes().iter().enumerate() {
            match &route.selector {
                NetworkSelector::Default => {
                    fallback = Some(RouteMatch::Default { index, route });
                }
                NetworkSelector::Direct => {}
                NetworkSelector::Cidr(block) => {
                    if ip.is_some_and(|ip| block.contains(ip)) {
                        debug!(index, network = %block, via = %route.via, "route matched");
                        return Ok(RouteMatch::Cidr { index, route });
                    }
                }
            }
        }

        match fallback {
            Some(m) => {
                debug!(via = %m.chain(), "using default route");
                Ok(m)
            }
            None => Err(RouteError::NotFound {
                target: target_ip.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(doc: &str) -> RouteTable {
        RouteTable::from_json_str(doc).unwrap()
    }

    #[test]
    fn test_first_declared_default_is_overridden() {
        let t = table(
            r#"{"routes":[
                {"network":"default","via":"old-bastion"},
                {"network":"10.0.0.0/8","via":"jumpA"},
                {"network":"default","via":"new-bastion"}
            ]}"#,
        );
        let m = RouteResolver::new().resolve_match("192.0.2.1", &t).unwrap();
        assert!(m.is_default());
        assert_eq!(m.chain().to_string(), "new-bastion");
        assert!(matches!(m, RouteMatch::Default { index: 2, .. }));
    }

    #[test]
    fn test_default_declared_first_does_not_shadow_cidr() {
        let t = table(
            r#"{"routes":[
                {"network":"default","via":"bastion"},
                {"network":"10.0.0.0/8","via":"jumpA"}
            ]}"#,
        );
        let chain = RouteResolver::new().resolve("10.9.9.9", &t).unwrap();
        assert_eq!(chain.to_string(), "jumpA");
    }

    #[test]
    fn test_empty_table_has_no_route() {
        let err = RouteResolver::new()
            .resolve("10.0.0.1", &RouteTable::default())
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::NotFound {
                target: "10.0.0.1".to_string()
            }
        );
    }
}
