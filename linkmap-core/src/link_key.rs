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

//! Directed edge identity in the application map

use crate::histogram::HistogramSchema;
use crate::service_type::ServiceType;
use serde::Serialize;
use std::fmt;

/// Application name plus service type, one end of an edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Application {
    pub name: String,
    pub service_type: ServiceType,
}

impl Application {
    pub fn new(name: impl Into<String>, service_type: ServiceType) -> Self {
        Self {
            name: name.into(),
            service_type,
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.service_type.name())
    }
}

/// `from -> to` edge. Ordered field by field: from name, from type, to name, to type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LinkKey {
    from_application: String,
    from_service_type: ServiceType,
    to_application: String,
    to_service_type: ServiceType,
}

impl LinkKey {
    pub fn of(
        from_application: impl Into<String>,
        from_service_type: ServiceType,
        to_application: impl Into<String>,
        to_service_type: ServiceType,
    ) -> Self {
        Self {
            from_application: from_application.into(),
            from_service_type,
            to_application: to_application.into(),
            to_service_type,
        }
    }

    pub fn between(from: &Application, to: &Application) -> Self {
        Self::of(
            from.name.clone(),
            from.service_type,
            to.name.clone(),
            to.service_type,
        )
    }

    pub fn from_application(&self) -> &str {
        &self.from_application
    }

    pub fn from_service_type(&self) -> ServiceType {
        self.from_service_type
    }

    pub fn to_application(&self) -> &str {
        &self.to_application
    }

    pub fn to_service_type(&self) -> ServiceType {
        self.to_service_type
    }

    pub fn caller(&self) -> Application {
        Application::new(self.from_application.clone(), self.from_service_type)
    }

    pub fn callee(&self) -> Application {
        Application::new(self.to_application.clone(), self.to_service_type)
    }

    /// Histogram schema of calls along this edge (the callee decides)
    pub fn histogram_schema(&self) -> HistogramSchema {
        self.to_service_type.histogram_schema()
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] -> {}[{}]",
            self.from_application,
            self.from_service_type.name(),
            self.to_application,
            self.to_service_type.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identical_fields_are_same_edge() {
        let a = LinkKey::of("api", ServiceType::TOMCAT, "cache", ServiceType::REDIS);
        let b = LinkKey::between(
            &Application::new("api", ServiceType::TOMCAT),
            &Application::new("cache", ServiceType::REDIS),
        );
        assert_eq!(a, b);

        let set: HashSet<_> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_direction_matters() {
        let forward = LinkKey::of("a", ServiceType::TOMCAT, "b", ServiceType::TOMCAT);
        let backward = LinkKey::of("b", ServiceType::TOMCAT, "a", ServiceType::TOMCAT);
        assert_ne!(forward, backward);
        assert!(forward < backward);
    }

    #[test]
    fn test_schema_follows_callee() {
        let key = LinkKey::of("api", ServiceType::TOMCAT, "cache", ServiceType::REDIS);
        assert_eq!(key.histogram_schema(), HistogramSchema::FAST);
    }
}
