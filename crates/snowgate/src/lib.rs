#![doc = include_str!("../README.md")]

mod error;
#[cfg(feature = "futures")]
mod futures;
mod generator;
mod layout;
mod status;
mod time;

pub use crate::error::*;
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::generator::*;
pub use crate::layout::*;
pub use crate::status::*;
pub use crate::time::*;
