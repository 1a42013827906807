#![cfg_attr(not(test), no_std)]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

#[macro_use]
mod fmt;

pub mod decode;
pub mod dht;
pub mod face;
#[cfg(test)]
mod mock;
pub mod pio;
pub mod session;
pub mod units;
