//! Client IP to country resolution.
//!
//! Resolvers are handed to [`ContextFactory`](crate::auth::ContextFactory)
//! at startup; there is no process-wide resolver to swap.

use std::collections::HashMap;
use std::net::IpAddr;

pub trait GeoResolver: Send + Sync {
    /// ISO 3166-1 alpha-2 country code for `ip`, if known.
    fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// Resolves from a fixed address table. Useful for tests and small
/// deployments behind a known set of gateways.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoResolver {
    table: HashMap<IpAddr, String>,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ip: IpAddr, country: impl Into<String>) -> Self {
        self.table.insert(ip, country.into());
        self
    }
}

impl GeoResolver for StaticGeoResolver {
    fn country_code(&self, ip: IpAddr) -> Option<String> {
        self.table.get(&ip).cloned()
    }
}
