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


//! Caller-side application-map statistics.
//!
//! Row key (34 bytes, before distribution):
//!
//! ```text
//! +--------------------------+-------------+----------------------------+
//! | application name (24, 0) | type (i16)  | u64::MAX - slot time (u64) |
//! +--------------------------+-------------+----------------------------+
//! ```
//!
//! The reversed timestamp makes the newest slot sort first. Column
//! qualifiers carry the callee and the histogram code:
//!
//! ```text
//! | callee type (i16) | slot code (i16) | callee name (rest) |
//! ```
//!
//! All integers are big-endian so byte order equals numeric order.

use crate::distributor::RowKeyDistributor;
use crate::registry::{
    DistributorRegistry, APPLICATION_NAME_LEN, SERVICE_TYPE_LEN, STATISTICS_CALLER, TIMESTAMP_LEN,
};
use crate::store::WideColumnStore;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use linkmap_core::{Application, Error, Result, ServiceType};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::trace;

/// Slot size the writer aggregates raw calls into
pub const RAW_SLOT_MS: i64 = 60_000;

pub const CALLER_ROW_KEY_LEN: usize = APPLICATION_NAME_LEN + SERVICE_TYPE_LEN + TIMESTAMP_LEN;
/// Bytes identifying the caller; the distributor hashes exactly these
pub const CALLER_ENTITY_LEN: usize = APPLICATION_NAME_LEN + SERVICE_TYPE_LEN;

const COLUMN_HEADER_LEN: usize = 2 * SERVICE_TYPE_LEN;

/// Start of the raw slot containing `timestamp`
#[inline]
pub fn raw_slot(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(RAW_SLOT_MS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerRowKey {
    pub application: String,
    pub service_type: ServiceType,
    pub slot_time: i64,
}

impl CallerRowKey {
    pub fn new(application: impl Into<String>, service_type: ServiceType, slot_time: i64) -> Self {
        Self {
            application: application.into(),
            service_type,
            slot_time,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = encode_entity(&self.application, self.service_type)?;
        buf.write_u64::<BigEndian>(reverse_timestamp(self.slot_time)?)?;
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CALLER_ROW_KEY_LEN {
            return Err(Error::InvalidRowKey(format!(
                "expected {CALLER_ROW_KEY_LEN} bytes, got {} ({})",
                bytes.len(),
                hex::encode(bytes)
            )));
        }
        let application = decode_name(&bytes[..APPLICATION_NAME_LEN])?;

        let mut cursor = Cursor::new(&bytes[APPLICATION_NAME_LEN..]);
        let service_type = ServiceType::from_code(cursor.read_i16::<BigEndian>()?);
        let reversed = cursor.read_u64::<BigEndian>()?;
        let slot_time = i64::try_from(u64::MAX - reversed).map_err(|_| {
            Error::InvalidRowKey(format!("timestamp out of range: {}", hex::encode(bytes)))
        })?;

        Ok(Self {
            application,
            service_type,
            slot_time,
        })
    }

    /// Logical scan bounds `[start, stop)` covering every slot of `caller`
    /// with `from <= slot_time <= to`
    pub fn scan_bounds(
        caller: &Application,
        from: i64,
        to: i64,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        if from > to {
            return Err(Error::InvalidTimeRange { from, to });
        }
        let entity = encode_entity(&caller.name, caller.service_type)?;

        // newest first: `to` gives the smallest key
        let mut start = entity.clone();
        start.write_u64::<BigEndian>(reverse_timestamp(to)?)?;

        let mut stop = entity;
        stop.write_u64::<BigEndian>(reverse_timestamp(from)?)?;
        stop.push(0);

        Ok((start, stop))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalleeColumn {
    pub service_type: ServiceType,
    pub slot_code: i16,
    pub application: String,
}

impl CalleeColumn {
    pub fn new(callee: &Application, slot_code: i16) -> Self {
        Self {
            service_type: callee.service_type,
            slot_code,
            application: callee.name.clone(),
        }
    }

    pub fn callee(&self) -> Application {
        Application::new(self.application.clone(), self.service_type)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(COLUMN_HEADER_LEN + self.application.len());
        buf.write_i16::<BigEndian>(self.service_type.code())?;
        buf.write_i16::<BigEndian>(self.slot_code)?;
        buf.extend_from_slice(self.application.as_bytes());
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < COLUMN_HEADER_LEN {
            return Err(Error::InvalidRowKey(format!(
                "column qualifier too short: {}",
                hex::encode(bytes)
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let service_type = ServiceType::from_code(cursor.read_i16::<BigEndian>()?);
        let slot_code = cursor.read_i16::<BigEndian>()?;
        let mut name = Vec::with_capacity(bytes.len() - COLUMN_HEADER_LEN);
        cursor.read_to_end(&mut name)?;
        let application = String::from_utf8(name).map_err(|_| {
            Error::InvalidRowKey(format!("callee name is not UTF-8: {}", hex::encode(bytes)))
        })?;

        Ok(Self {
            service_type,
            slot_code,
            application,
        })
    }
}

fn encode_entity(application: &str, service_type: ServiceType) -> Result<Vec<u8>> {
    let name = application.as_bytes();
    if name.is_empty() || name.len() > APPLICATION_NAME_LEN {
        return Err(Error::InvalidRowKey(format!(
            "application name must be 1..={APPLICATION_NAME_LEN} bytes, got {}",
            name.len()
        )));
    }
    let mut buf = Vec::with_capacity(CALLER_ROW_KEY_LEN + 1);
    buf.extend_from_slice(name);
    buf.resize(APPLICATION_NAME_LEN, 0);
    buf.write_i16::<BigEndian>(service_type.code())?;
    Ok(buf)
}

fn decode_name(padded: &[u8]) -> Result<String> {
    let end = padded.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(padded[..end].to_vec()).map_err(|_| {
        Error::InvalidRowKey(format!(
            "application name is not UTF-8: {}",
            hex::encode(padded)
        ))
    })
}

fn reverse_timestamp(timestamp: i64) -> Result<u64> {
    u64::try_from(timestamp)
        .map(|ts| u64::MAX - ts)
        .map_err(|_| Error::InvalidRowKey(format!("negative timestamp {timestamp}")))
}

/// Records calls into the distributed caller-statistics table
pub struct StatisticsWriter<S: WideColumnStore + ?Sized> {
    store: Arc<S>,
    distributor: Arc<RowKeyDistributor>,
}

impl<S: WideColumnStore + ?Sized> StatisticsWriter<S> {
    pub fn new(store: Arc<S>, registry: &DistributorRegistry) -> Result<Self> {
        Ok(Self {
            store,
            distributor: registry.get(STATISTICS_CALLER)?,
        })
    }

    /// Add `count` calls from `caller` to `callee` at `timestamp`.
    ///
    /// The call lands in the raw slot of `timestamp`, classified by the
    /// callee's histogram schema.
    pub async fn record_call(
        &self,
        caller: &Application,
        callee: &Application,
        timestamp: i64,
        elapsed_ms: i32,
        is_error: bool,
        count: i64,
    ) -> Result<()> {
        if count < 0 {
            return Err(Error::InvalidCount(count));
        }
        let slot_time = raw_slot(timestamp);
        let schema = callee.service_type.histogram_schema();
        let slot = schema.slot_for_elapsed(elapsed_ms, is_error);

        let row = CallerRowKey::new(caller.name.clone(), caller.service_type, slot_time).encode()?;
        let row = self.distributor.distribute(&row)?;
        let qualifier = CalleeColumn::new(callee, schema.code(slot)).encode()?;

        trace!(%caller, %callee, slot_time, %slot, count, "recording call");
        self.store
            .increment(STATISTICS_CALLER, &row, &qualifier, count)
            .await
    }
}
