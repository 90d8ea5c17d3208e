//! Core domain types and shared logic for the modprox module proxy.
//!
//! This crate defines the data model used across all other crates:
//! - Module coordinates and registry serial IDs
//! - Range-compressed serial ID sets for the registry diff protocol
//! - Version ordering and the case-folding path escape
//! - In-memory archives and the normalization rewrite
//! - Configuration for the proxy and the registry

pub mod config;
pub mod coordinate;
pub mod error;
pub mod escape;
pub mod ranges;
pub mod rewrite;
pub mod version;
pub mod zipfile;

pub use coordinate::{ModuleCoordinate, SerialCoordinate, SerialId};
pub use error::{Error, Result};
pub use ranges::{RangeId, RangeIds};
pub use rewrite::rewrite;
pub use zipfile::Blob;
