//! Repository traits for index operations.

pub mod modules;

pub use modules::ModuleRepo;
