#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `snowgate` via
// `snowgate_tonic_core::snowgate`
pub use snowgate;
