//! Module coordinates: the `(source, version)` pairs everything is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-assigned serial identifier of a module coordinate.
///
/// Serial IDs are assigned in increasing order and never reused, but a
/// single source's versions are not contiguous.
pub type SerialId = i64;

/// A module source path paired with one of its versions.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleCoordinate {
    pub source: String,
    pub version: String,
}

impl ModuleCoordinate {
    /// Create a coordinate, validating both halves.
    pub fn new(source: impl Into<String>, version: impl Into<String>) -> crate::Result<Self> {
        let coordinate = Self {
            source: source.into(),
            version: version.into(),
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Parse the `source@version` form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (source, version) = s.split_once('@').ok_or_else(|| {
            crate::Error::InvalidCoordinate(format!("expected source@version, got {s:?}"))
        })?;
        Self::new(source, version)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.source.is_empty() {
            return Err(crate::Error::InvalidCoordinate(
                "source cannot be empty".to_string(),
            ));
        }
        if self.version.is_empty() {
            return Err(crate::Error::InvalidCoordinate(
                "version cannot be empty".to_string(),
            ));
        }
        if self.source.starts_with('/') || self.source.ends_with('/') {
            return Err(crate::Error::InvalidCoordinate(format!(
                "source {:?} cannot begin or end with '/'",
                self.source
            )));
        }
        for c in self.source.chars().chain(self.version.chars()) {
            if c.is_whitespace() || c == '@' {
                return Err(crate::Error::InvalidCoordinate(format!(
                    "invalid character {c:?} in {self}"
                )));
            }
        }
        Ok(())
    }

    /// The directory every entry of a normalized archive lives under.
    pub fn zip_prefix(&self) -> String {
        format!("{}@{}/", self.source, self.version)
    }

    /// The first path segment of the source, the host it is published on.
    pub fn domain(&self) -> &str {
        match self.source.split_once('/') {
            Some((domain, _)) => domain,
            None => &self.source,
        }
    }
}

impl fmt::Debug for ModuleCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleCoordinate({self})")
    }
}

impl fmt::Display for ModuleCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.source, self.version)
    }
}

/// A coordinate together with the serial ID the registry assigned it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialCoordinate {
    #[serde(flatten)]
    pub module: ModuleCoordinate,
    #[serde(rename = "id")]
    pub serial_id: SerialId,
}

impl SerialCoordinate {
    pub fn new(module: ModuleCoordinate, serial_id: SerialId) -> Self {
        Self { module, serial_id }
    }
}

impl fmt::Display for SerialCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.module, self.serial_id)
    }
}
