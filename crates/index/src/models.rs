//! Database models mapping to the index schema.

use modprox_core::{ModuleCoordinate, SerialId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// One indexed module version.
#[derive(Debug, Clone, FromRow)]
pub struct ModuleRow {
    pub source: String,
    pub version: String,
    pub serial_id: SerialId,
    pub go_mod: String,
    pub indexed_at: OffsetDateTime,
}

impl ModuleRow {
    pub fn info(&self) -> RevInfo {
        RevInfo {
            version: self.version.clone(),
            time: self.indexed_at,
        }
    }
}

/// Everything recorded about a module when it is first indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAddition {
    pub coordinate: ModuleCoordinate,
    pub serial_id: SerialId,
    pub mod_file: String,
}

/// The `.info` document served for a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevInfo {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Time", with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

/// Aggregate counts over the whole index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub sources: i64,
    pub versions: i64,
}
