// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! JSON shapes exchanged with the processing service.
//!
//! The bridge itself treats payloads as opaque text; these types back the
//! typed helpers on [`crate::Bridge`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// One proxy configuration to check through the proxy core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfigEntry {
    pub url: String,
    /// Core config file generated for this proxy.
    #[serde(rename = "jsonFilePath")]
    pub json_file_path: String,
    /// Local inbound port the core listens on.
    pub port: u16,
}

/// Input of `ProcessProxies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCheckRequest {
    pub configs: Vec<ProxyConfigEntry>,
}

/// Geo lookup made through a working proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub query: String,
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub region_name: String,
    pub city: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCheckOutput {
    pub url: String,
    pub location: Location,
}

/// Output of `ProcessProxies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCheckReport {
    /// `null` from the service when no proxy passed.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub outputs: Vec<ProxyCheckOutput>,
}

/// Scraped resource returned by both fetch operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Destination path the resource is meant to be dumped to.
    pub filepath: String,
    #[serde(rename = "rawResults")]
    pub raw_results: String,
    pub name: String,
}

impl Resource {
    /// Result lines with duplicates dropped, first occurrence kept.
    pub fn lines(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.raw_results
            .lines()
            .filter(|line| seen.insert(*line))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLimit {
    pub limit: u32,
}

/// Input of `FetchTGChannels`: channel id to number of messages wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelQuery(pub BTreeMap<String, ChannelLimit>);

impl ChannelQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, id: impl Into<String>, limit: u32) -> Self {
        self.0.insert(id.into(), ChannelLimit { limit });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn null_as_empty<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(de)?.unwrap_or_default())
}
