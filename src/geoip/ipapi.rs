use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{GeoIpError, GeoIpLookup};
use crate::config::GeoIpConfig;

/// Client for the ip-api.com JSON endpoint.
#[derive(Clone)]
pub struct IpApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl IpApiClient {
    pub fn new(config: &GeoIpConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url_for(&self, ip: &str) -> String {
        format!("{}/{}?fields=status,message,countryCode", self.base_url, ip)
    }
}

#[async_trait]
impl GeoIpLookup for IpApiClient {
    async fn lookup(&self, ip: &str) -> Result<String, GeoIpError> {
        let url = self.url_for(ip);
        debug!(%url, %ip, "requesting geoip");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(GeoIpError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, %ip, "geoip returned non-success status");
            return Err(GeoIpError::Status(status));
        }

        let body: IpApiResponse = resp.json().await.map_err(GeoIpError::Decode)?;
        if body.status.as_deref() == Some("fail") {
            return Err(GeoIpError::Rejected {
                ip: ip.to_string(),
                message: body.message.unwrap_or_else(|| "unknown reason".into()),
            });
        }

        match body.country_code {
            Some(code) if !code.trim().is_empty() => {
                debug!(%ip, country = %code, "geoip success");
                Ok(code)
            }
            _ => Err(GeoIpError::Empty(ip.to_string())),
        }
    }
}
