#![no_std]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

pub mod dht;

pub use self::dht::{PioTransport, Sensor, SystemTicks};
