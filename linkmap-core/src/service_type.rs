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

//! Service types
//!
//! A service type identifies what kind of node an application is in the
//! dependency graph (a servlet container, a database, a cache...). It is
//! persisted by its 16-bit code and decides which histogram schema is used
//! for calls *into* that node.

use crate::histogram::HistogramSchema;
use serde::ser::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy)]
pub struct ServiceType {
    code: i16,
    name: &'static str,
    schema: HistogramSchema,
}

impl ServiceType {
    pub const UNDEFINED: ServiceType = ServiceType::new(-1, "UNDEFINED", HistogramSchema::NORMAL);
    pub const UNKNOWN: ServiceType = ServiceType::new(1, "UNKNOWN", HistogramSchema::NORMAL);
    pub const USER: ServiceType = ServiceType::new(2, "USER", HistogramSchema::NORMAL);
    pub const STAND_ALONE: ServiceType =
        ServiceType::new(1000, "STAND_ALONE", HistogramSchema::NORMAL);
    pub const TOMCAT: ServiceType = ServiceType::new(1010, "TOMCAT", HistogramSchema::NORMAL);
    pub const SPRING_BOOT: ServiceType =
        ServiceType::new(1210, "SPRING_BOOT", HistogramSchema::NORMAL);
    pub const MYSQL: ServiceType = ServiceType::new(2100, "MYSQL", HistogramSchema::NORMAL);
    pub const MEMCACHED: ServiceType = ServiceType::new(8050, "MEMCACHED", HistogramSchema::FAST);
    pub const REDIS: ServiceType = ServiceType::new(8200, "REDIS", HistogramSchema::FAST);
    pub const HTTP_CLIENT: ServiceType =
        ServiceType::new(9052, "HTTP_CLIENT", HistogramSchema::NORMAL);

    const KNOWN: [ServiceType; 10] = [
        Self::UNDEFINED,
        Self::UNKNOWN,
        Self::USER,
        Self::STAND_ALONE,
        Self::TOMCAT,
        Self::SPRING_BOOT,
        Self::MYSQL,
        Self::MEMCACHED,
        Self::REDIS,
        Self::HTTP_CLIENT,
    ];

    pub const fn new(code: i16, name: &'static str, schema: HistogramSchema) -> Self {
        Self { code, name, schema }
    }

    /// Resolve a persisted code. Unregistered codes keep their code but are
    /// reported as `UNDEFINED` with the default schema.
    pub fn from_code(code: i16) -> ServiceType {
        Self::KNOWN
            .into_iter()
            .find(|t| t.code == code)
            .unwrap_or(ServiceType::new(code, "UNDEFINED", HistogramSchema::NORMAL))
    }

    /// Resolve a registered name (case-insensitive)
    pub fn from_name(name: &str) -> Option<ServiceType> {
        Self::KNOWN
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn code(&self) -> i16 {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn histogram_schema(&self) -> HistogramSchema {
        self.schema
    }
}

// Identity is the code alone.
impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl PartialOrd for ServiceType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.code)
    }
}

impl Serialize for ServiceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}
