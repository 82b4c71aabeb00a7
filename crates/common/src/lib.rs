//! Shared identifier types used across the headcount crates.

pub mod types;

pub use types::MemberId;
