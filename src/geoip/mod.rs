//! Country lookup by IP address.

mod ipapi;

pub use ipapi::IpApiClient;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum GeoIpError {
    #[error("geoip request failed")]
    Request(#[source] reqwest::Error),
    #[error("geoip service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode geoip response")]
    Decode(#[source] reqwest::Error),
    #[error("geoip service rejected {ip}: {message}")]
    Rejected { ip: String, message: String },
    #[error("geoip service returned no country for {0}")]
    Empty(String),
}

/// Resolves an IP literal to an ISO country code.
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<String, GeoIpError>;
}
