#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod log;

mod error;

pub mod clock;
pub mod config;
pub mod device;
pub mod interface;
pub mod params;
#[cfg(any(test, feature = "std"))]
pub mod record;
pub mod registers;
pub mod sample;

pub use crate::clock::{Clock, DateTime};
pub use crate::device::Ina3221;
pub use crate::error::{Error, Result};
pub use crate::sample::{Channel, ChannelReading, RawSample, Reading};
