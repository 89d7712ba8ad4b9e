//! Command protocol catalog (`/jsonprotocols.json`): protocol name to a
//! table of named command values.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CatalogError;

pub const DEFAULT_CATALOG_PATH: &str = "/jsonprotocols.json";

pub type CommandTable = BTreeMap<String, i64>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolCatalog {
    protocols: BTreeMap<String, CommandTable>,
}

impl ProtocolCatalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn fetch(http: &Client, url: &str) -> Result<Self, CatalogError> {
        let fetch_err = |source: reqwest::Error| CatalogError::Fetch {
            url: url.to_string(),
            source,
        };
        let body = http
            .get(url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(fetch_err)?
            .text()
            .await
            .map_err(fetch_err)?;
        let catalog = Self::from_json(&body)?;
        info!(url, protocols = catalog.len(), "catalog: fetched protocol catalog");
        Ok(catalog)
    }

    /// Fetches over HTTP when `source` is an http(s) URL, otherwise reads a file.
    pub async fn load(source: &str) -> Result<Self, CatalogError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return Self::fetch(&Client::new(), source).await;
        }
        let raw = tokio::fs::read_to_string(source)
            .await
            .map_err(|source_err| CatalogError::Read {
                path: source.to_string(),
                source: source_err,
            })?;
        Self::from_json(&raw)
    }

    pub fn protocol_names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn table(&self, protocol: &str) -> Option<&CommandTable> {
        self.protocols.get(protocol)
    }

    pub fn lookup(&self, protocol: &str, command: &str) -> Option<i64> {
        self.table(protocol)?.get(command).copied()
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
