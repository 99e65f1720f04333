//! Portfolio dashboard aggregates.

pub mod stats;
