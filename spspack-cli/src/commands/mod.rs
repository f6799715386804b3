//! CLI command implementations.

pub mod explore;
pub mod fetch;
pub mod pack;
