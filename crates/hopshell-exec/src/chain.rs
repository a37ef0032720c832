//! Relay chains

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ExecError;

const DIRECT: &str = "direct";

/// Ordered relay hosts a remote operation is tunneled through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chain {
    /// No intermediate hop
    Direct,
    /// One or more relay hops, in traversal order (never empty)
    Relays(Vec<String>),
}

impl Chain {
    /// Parse a comma-joined chain or the `direct` sentinel
    ///
    /// # Errors
    /// Returns `ExecError::InvalidChain` for an empty chain or an empty hop
    pub fn parse(value: &str) -> Result<Self, ExecError> {
        let value = value.trim();
        if value == DIRECT {
            return Ok(Chain::Direct);
        }
        Self::from_hops(value.split(','))
    }

    /// Build a chain from individual hops
    ///
    /// # Errors
    /// Returns `ExecError::InvalidChain` when no hops are given, a hop is
    /// empty, or a hop contains whitespace
    pub fn from_hops<I, S>(hops: I) -> Result<Self, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut relays = Vec::new();
        for hop in hops {
            let hop = hop.as_ref().trim();
            if hop.is_empty() {
                return Err(ExecError::InvalidChain("empty hop".to_string()));
            }
            if hop.chars().any(char::is_whitespace) || hop.contains(',') {
                return Err(ExecError::InvalidChain(format!("malformed hop '{hop}'")));
            }
            relays.push(hop.to_string());
        }

        match relays.as_slice() {
            [] => Err(ExecError::InvalidChain("no hops".to_string())),
            [only] if only == DIRECT => Ok(Chain::Direct),
            _ => Ok(Chain::Relays(relays)),
        }
    }

    /// Whether no relay is used
    #[must_use]
    pub fn is_direct(&self) -> bool {
        matches!(self, Chain::Direct)
    }

    /// Relay hops in order; empty for `Direct`
    #[must_use]
    pub fn hops(&self) -> &[String] {
        match self {
            Chain::Direct => &[],
            Chain::Relays(hops) => hops,
        }
    }

    /// First hop, if any
    #[must_use]
    pub fn first_hop(&self) -> Option<&str> {
        self.hops().first().map(String::as_str)
    }

    /// Value for ssh `-J` / `ProxyJump=`; `None` for `Direct`
    #[must_use]
    pub fn relay_directive(&self) -> Option<String> {
        match self {
            Chain::Direct => None,
            Chain::Relays(hops) => Some(hops.join(",")),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Direct => f.write_str(DIRECT),
            Chain::Relays(hops) => f.write_str(&hops.join(",")),
        }
    }
}

impl Serialize for Chain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Chain::Direct => serializer.serialize_str(DIRECT),
            Chain::Relays(hops) => hops.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainRepr {
    Joined(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match ChainRepr::deserialize(deserializer)? {
            ChainRepr::Joined(s) => Chain::parse(&s),
            ChainRepr::List(hops) => Chain::from_hops(hops),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
