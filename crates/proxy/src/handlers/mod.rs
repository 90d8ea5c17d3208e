//! HTTP request handlers.

pub mod health;
pub mod modules;
pub mod problems;

pub use health::*;
pub use modules::*;
pub use problems::*;
