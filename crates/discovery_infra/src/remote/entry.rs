//! `RemoteEntry`: the shape a blocking/catalog read returns per endpoint.
//!
//! Modeled the way `deribit::public` models a vendor API response: derived
//! `Deserialize`, `snake_case` renaming, and `#[serde(default)]` for fields
//! the registry may omit.

use std::collections::HashMap;

use serde::Deserialize;

use discovery_core::dedup::Identified;
use discovery_core::degrade::{AggregatedHealth, HasHealth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatedStatus {
    Passing,
    Warning,
    Critical,
}

impl From<AggregatedStatus> for AggregatedHealth {
    fn from(status: AggregatedStatus) -> Self {
        match status {
            AggregatedStatus::Passing => AggregatedHealth::Passing,
            AggregatedStatus::Warning => AggregatedHealth::Warning,
            AggregatedStatus::Critical => AggregatedHealth::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Weights {
    #[serde(default)]
    pub passing: i32,
    #[serde(default)]
    pub warning: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Checks {
    pub aggregated_status: AggregatedStatus,
}

/// A single endpoint as returned by a blocking or catalog read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub meta: HashMap<String, String>,
    pub checks: Checks,
    pub modify_index: u64,
    #[serde(default)]
    pub weights: Weights,
}

impl Identified for RemoteEntry {
    fn entry_id(&self) -> &str {
        &self.id
    }

    fn modify_index(&self) -> u64 {
        self.modify_index
    }
}

impl HasHealth for RemoteEntry {
    fn aggregated_health(&self) -> AggregatedHealth {
        self.checks.aggregated_status.into()
    }
}
