//! Quantity types shared across the crate.
pub use uom::si::f64::{Ratio, ThermodynamicTemperature};
