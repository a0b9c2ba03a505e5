#![warn(clippy::unwrap_used)]
use thiserror::Error;

pub mod catalog;
pub mod commands;
pub mod config_flow;
pub mod coordinator;
pub mod ducoapi;
pub mod entities;
pub mod fieldaccess;
pub mod normalize;
pub mod snapshot;
#[cfg(test)]
mod testutil;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error {0}")]
    Runtime(String),
    #[error("Request error {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Request to {path} failed with status {status}")]
    Status { path: String, status: reqwest::StatusCode },
    #[error("Serialization error {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid url {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid url scheme '{0}', only http and https are supported")]
    InvalidScheme(String),
    #[error("Failed to fetch data from Ducobox API: {0}")]
    UpdateFailed(Box<Error>),
    #[error("Cannot connect to {url}: {source}")]
    CannotConnect { url: String, source: Box<Error> },
    #[error("Discovered service '{0}' is not a Duco device")]
    NotDucoDevice(String),
    #[error("Invalid option for action '{action}': '{option}'")]
    InvalidOption { action: String, option: String },
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: f64 },
    #[error("Value {value} for '{key}' is outside {min}..={max}")]
    OutOfRange { key: String, value: f64, min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
