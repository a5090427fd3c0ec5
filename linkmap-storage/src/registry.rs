// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Per-table distributor registry
//!
//! Built once at start-up and shared read-only (`Arc`) with every writer and
//! reader. Changing the entry of a table that already holds data means
//! rewriting that data; nothing here migrates existing rows.
//!
//! Range bounds are computed from the row-key layouts below rather than
//! written as literals, so a layout change moves the hashed window with it.

use crate::distributor::RowKeyDistributor;
use linkmap_core::{DistributorSpec, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Zero-padded application name
pub const APPLICATION_NAME_LEN: usize = 24;
/// Zero-padded agent id
pub const AGENT_ID_LEN: usize = 24;
pub const SERVICE_TYPE_LEN: usize = 2;
pub const TIMESTAMP_LEN: usize = 8;
pub const SEQUENCE_LEN: usize = 8;
pub const STAT_TYPE_LEN: usize = 1;
pub const METADATA_ID_LEN: usize = 4;

pub const APPLICATION_TRACE_INDEX: &str = "ApplicationTraceIndex";
pub const TRACE_V2: &str = "TraceV2";
pub const APPLICATION_STAT: &str = "ApplicationStatAggre";
pub const AGENT_STAT_V2: &str = "AgentStatV2";
pub const API_METADATA: &str = "ApiMetaData";
pub const STRING_METADATA: &str = "StringMetaData";
pub const SQL_METADATA_V2: &str = "SqlMetaData_Ver2";
pub const HOST_APPLICATION_MAP: &str = "HostApplicationMap_Ver2";
pub const STATISTICS_CALLER: &str = "ApplicationMapStatisticsCaller_Ver2";
pub const STATISTICS_CALLEE: &str = "ApplicationMapStatisticsCallee_Ver2";
pub const STATISTICS_SELF: &str = "ApplicationMapStatisticsSelf_Ver2";

/// Built-in distributor table
pub fn default_specs() -> Vec<DistributorSpec> {
    // agentId | txStartTime | sequence -> spread one agent's transactions
    let trace_sequence_start = AGENT_ID_LEN + TIMESTAMP_LEN;
    // id | statType | reversed ts
    let stat_entity = AGENT_ID_LEN + STAT_TYPE_LEN;
    // agentId | agentStartTime [| metadata id]
    let agent_instance = AGENT_ID_LEN + TIMESTAMP_LEN;
    // applicationName | serviceType | reversed slot ts
    let statistics_entity = APPLICATION_NAME_LEN + SERVICE_TYPE_LEN;

    vec![
        DistributorSpec::whole_key(APPLICATION_TRACE_INDEX, 32),
        DistributorSpec::range(
            TRACE_V2,
            trace_sequence_start,
            trace_sequence_start + SEQUENCE_LEN,
            256,
        ),
        DistributorSpec::range(APPLICATION_STAT, 0, stat_entity, 64),
        DistributorSpec::range(AGENT_STAT_V2, 0, stat_entity, 64),
        DistributorSpec::range(API_METADATA, 0, agent_instance, 8),
        DistributorSpec::range(STRING_METADATA, 0, agent_instance, 8),
        DistributorSpec::range(SQL_METADATA_V2, 0, agent_instance + METADATA_ID_LEN, 32),
        DistributorSpec::range(HOST_APPLICATION_MAP, 0, APPLICATION_NAME_LEN, 4),
        DistributorSpec::range(STATISTICS_CALLER, 0, statistics_entity, 32),
        DistributorSpec::range(STATISTICS_CALLEE, 0, statistics_entity, 32),
        DistributorSpec::range(STATISTICS_SELF, 0, statistics_entity, 8),
    ]
}

/// Table name -> distributor
#[derive(Debug, Default)]
pub struct DistributorRegistry {
    tables: BTreeMap<String, Arc<RowKeyDistributor>>,
    specs: BTreeMap<String, DistributorSpec>,
}

impl DistributorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in tables
    pub fn with_defaults() -> Result<Self> {
        Self::from_specs(&default_specs())
    }

    /// Built-in tables, then `overrides` replacing or adding entries
    pub fn with_overrides(overrides: &[DistributorSpec]) -> Result<Self> {
        let mut registry = Self::with_defaults()?;
        for spec in overrides {
            registry.register(spec.clone())?;
        }
        Ok(registry)
    }

    pub fn from_specs(specs: &[DistributorSpec]) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec.clone())?;
        }
        Ok(registry)
    }

    /// Validate and add (or replace) a table
    pub fn register(&mut self, spec: DistributorSpec) -> Result<Arc<RowKeyDistributor>> {
        let distributor = Arc::new(RowKeyDistributor::from_spec(&spec)?);
        if self.specs.contains_key(&spec.table) {
            tracing::info!(table = %spec.table, "overriding distributor");
        }
        self.tables
            .insert(spec.table.clone(), Arc::clone(&distributor));
        self.specs.insert(spec.table.clone(), spec);
        Ok(distributor)
    }

    pub fn get(&self, table: &str) -> Result<Arc<RowKeyDistributor>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    pub fn spec(&self, table: &str) -> Option<&DistributorSpec> {
        self.specs.get(table)
    }

    /// Specs in table-name order
    pub fn specs(&self) -> impl Iterator<Item = &DistributorSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
