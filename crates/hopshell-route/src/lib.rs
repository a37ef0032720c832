//! hopshell-route: Route table and relay chain selection
//!
//! Maps a target address to the relay chain that reaches it, using
//! first-match CIDR rules with an explicit default fallback.

pub mod address;
pub mod cidr;
pub mod error;
pub mod resolver;
pub mod table;

pub use address::{AddressResolver, DnsLookup, HostLookup, Resolution, TargetHost};
pub use cidr::CidrBlock;
pub use error::RouteError;
pub use resolver::{RouteMatch, RouteResolver};
pub use table::{NetworkSelector, Route, RouteTable};
