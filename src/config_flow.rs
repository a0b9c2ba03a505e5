use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ducoapi::DeviceApi, Error, Result};

const DISCOVERY_PREFIXES: [&str; 2] = ["duco_", "duco "];

/// Persisted when a board is added, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

/// A service announced on the local network.
#[derive(Debug, Clone)]
pub struct DiscoveryInfo {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// The board only serves http and https.
pub fn validate_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidScheme(scheme.to_string())),
    }
}

/// Checks that the board answers a lightweight info request.
pub async fn probe<A: DeviceApi + ?Sized>(api: &A) -> Result<()> {
    let base_url = api.base_url();
    api.get_info().await.map(|_| ()).map_err(|err| {
        log::warn!("Board at {base_url} is not reachable: {err}");
        Error::CannotConnect {
            url: base_url.to_string(),
            source: Box::new(err),
        }
    })
}

/// Validates the url of the client and probes the board before accepting it.
/// The stored url is always the one that was probed.
pub async fn entry_from_user<A: DeviceApi + ?Sized>(api: &A) -> Result<ConfigEntry> {
    let base_url = api.base_url();
    validate_base_url(base_url)?;
    probe(api).await?;

    Ok(ConfigEntry {
        base_url: base_url.to_string(),
        unique_id: None,
    })
}

/// Only services named `DUCO_...` or `DUCO [...]` are boards, e.g. `DUCO [001a2b3c4d5e]`.
pub fn entry_from_discovery(info: &DiscoveryInfo) -> Result<ConfigEntry> {
    let name = info.name.to_lowercase();
    if !DISCOVERY_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return Err(Error::NotDucoDevice(info.name.clone()));
    }

    let host = info
        .addresses
        .first()
        .ok_or_else(|| Error::Runtime(format!("No address announced for '{}'", info.name)))?;
    let unique_id = info
        .name
        .split_whitespace()
        .nth(1)
        .map(|id| id.trim_matches(&['[', ']'][..]).to_string())
        .ok_or_else(|| Error::Runtime(format!("No identifier in service name '{}'", info.name)))?;

    let base_url = match host {
        IpAddr::V4(addr) => format!("https://{addr}"),
        IpAddr::V6(addr) => format!("https://[{addr}]"),
    };

    log::debug!("Discovered board {unique_id} at {base_url}");
    Ok(ConfigEntry {
        base_url,
        unique_id: Some(unique_id),
    })
}
