//! DHT11 and DHT22 temperature and humidity frame decoder.
//!
//! # Encoding
//!
//! A DHT frame is 5 bytes, the most significant bit is first:
//!
//! ```txt
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Humidity hi  |  Humidity lo  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Temp hi    |    Temp lo    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Checksum   |
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! where the checksum is the low 8 bits of the sum of the first four bytes.
//!
//! The two models read the fields differently:
//! - DHT11: each field is an integer byte followed by a tenths byte.
//! - DHT22: each field is a 16 bit big endian count of tenths. The top bit of
//!   the temperature field is a sign flag.
//!
//! See: [DHT11 datasheet] § 5, [DHT22 datasheet] § 7.
//!
//! [DHT11 datasheet]: https://www.mouser.com/datasheet/2/758/DHT11-Technical-Data-Sheet-Translated-Version-1143054.pdf
//! [DHT22 datasheet]: https://cdn-shop.adafruit.com/datasheets/Digital+humidity+and+temperature+sensor+AM2302.pdf
use bitvec::prelude::*;
use uom::si::{ratio::percent, thermodynamic_temperature::degree_celsius};

use crate::units::{Ratio, ThermodynamicTemperature};

pub type Result<T> = core::result::Result<T, Error>;

/// Represents a frame decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The checksum is mismatched.
    #[error(
        "checksum mismatched (expected {:#0x}, found {:#0x})",
        expected,
        actual
    )]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Represents a DHT sensor model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    Dht11,
    Dht22,
}

/// Represents a raw 5 byte frame as shifted out by the sensor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::Deref, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame([u8; Frame::LEN]);

/// Represents decoded sensor data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Relative humidity.
    pub humidity: Ratio,
    /// Temperature.
    pub temperature: ThermodynamicTemperature,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Reading {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Reading {{ humidity: {}%, temperature: {}°C }}",
            self.humidity.get::<percent>(),
            self.temperature.get::<degree_celsius>(),
        );
    }
}

impl Frame {
    /// Number of bytes in a frame.
    pub const LEN: usize = 5;

    #[must_use]
    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the checksum byte sent by the sensor.
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.0[4]
    }

    /// Returns the checksum computed over the payload, a truncating 8 bit sum.
    #[must_use]
    pub fn payload_sum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |sum, v| sum.wrapping_add(*v))
    }

    /// Returns `true` if the checksum byte matches the payload.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.checksum() == self.payload_sum()
    }

    fn bits(&self) -> &BitSlice<u8, Msb0> {
        self.0.view_bits()
    }
}

/// Checks a frame's checksum.
pub fn validate(frame: &Frame) -> Result<()> {
    if frame.is_valid() {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: frame.checksum(),
            actual: frame.payload_sum(),
        })
    }
}

/// Decodes a frame for the given model. Frames failing [`validate`] never
/// produce a [`Reading`].
pub fn decode(frame: &Frame, model: Model) -> Result<Reading> {
    validate(frame)?;

    let (humidity, temperature) = match model {
        Model::Dht11 => decode_dht11(frame.bits()),
        Model::Dht22 => decode_dht22(frame.bits()),
    };

    Ok(Reading {
        humidity: Ratio::new::<percent>(humidity),
        temperature: ThermodynamicTemperature::new::<degree_celsius>(temperature),
    })
}

/// Returns `(humidity, temperature)` from an integer byte and a tenths byte
/// per field.
fn decode_dht11(bits: &BitSlice<u8, Msb0>) -> (f64, f64) {
    let field = |x: &BitSlice<u8, Msb0>| {
        f64::from(x[0..8].load_be::<u8>()) + f64::from(x[8..16].load_be::<u8>()) * 0.1
    };
    (field(&bits[0..16]), field(&bits[16..32]))
}

/// Returns `(humidity, temperature)` from 16 bit counts of tenths.
fn decode_dht22(bits: &BitSlice<u8, Msb0>) -> (f64, f64) {
    let humidity = f64::from(bits[0..16].load_be::<u16>()) * 0.1;
    // The sign flag (bit 16) is masked off and never applied: below zero
    // readings come back as their magnitude.
    let temperature = f64::from(bits[17..32].load_be::<u16>()) * 0.1;
    (humidity, temperature)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use float_eq::assert_float_eq;

    use super::*;

    fn assert_reading(reading: &Reading, humidity: f64, temperature: f64) {
        assert_float_eq!(reading.humidity.get::<percent>(), humidity, abs <= 1e-9);
        assert_float_eq!(
            reading.temperature.get::<degree_celsius>(),
            temperature,
            abs <= 1e-9
        );
    }

    #[test]
    fn dht11_integer_reading() -> Result<()> {
        let frame = Frame::new([60, 0, 25, 0, 85]);
        assert!(frame.is_valid());
        assert_reading(&decode(&frame, Model::Dht11)?, 60.0, 25.0);
        Ok(())
    }

    #[test]
    fn dht11_tenths() -> Result<()> {
        let frame = Frame::new([0x27, 0x03, 0x14, 0x08, 0x46]);
        assert_reading(&decode(&frame, Model::Dht11)?, 39.3, 20.8);
        Ok(())
    }

    #[test]
    fn dht11_high_byte_is_not_signed() -> Result<()> {
        let frame = Frame::new([0x27, 0x03, 0x94, 0x08, 0xc6]);
        assert_reading(&decode(&frame, Model::Dht11)?, 39.3, 148.8);
        Ok(())
    }

    #[test]
    fn dht22_reading() -> Result<()> {
        let frame = Frame::new([0x02, 0x8C, 0x01, 0x11, 0xA0]);
        assert!(frame.is_valid());
        assert_reading(&decode(&frame, Model::Dht22)?, 65.2, 27.3);
        Ok(())
    }

    #[test]
    fn dht22_sign_flag_is_not_applied() -> Result<()> {
        let frame = Frame::new([0x00, 0x64, 0x80, 0x65, 0x49]);
        assert_reading(&decode(&frame, Model::Dht22)?, 10.0, 10.1);
        Ok(())
    }

    #[test]
    fn checksum_wraps() -> Result<()> {
        let frame = Frame::new([0xFF, 0xFF, 0x01, 0x02, 0x01]);
        assert_eq!(frame.payload_sum(), 0x01);
        validate(&frame)?;
        Ok(())
    }

    #[test]
    fn checksum_mismatch() {
        assert_eq!(
            decode(&Frame::new([0x27, 0x00, 0x14, 0x00, 0x00]), Model::Dht11),
            Err(Error::ChecksumMismatch {
                expected: 0x00,
                actual: 0x3b
            })
        );

        assert_eq!(
            decode(&Frame::new([0x02, 0x8C, 0x01, 0x11, 0xA1]), Model::Dht22),
            Err(Error::ChecksumMismatch {
                expected: 0xa1,
                actual: 0xa0
            })
        );
    }

    #[test]
    fn checksum_is_sum_of_payload() {
        // 0x02 + 0x8C + 0x01 + 0x11 = 0xA0, so a checksum of 0x9E is corrupt
        // even though the payload decodes to plausible values.
        let frame = Frame::new([0x02, 0x8C, 0x01, 0x11, 0x9E]);
        assert_eq!(frame.payload_sum(), 0xA0);
        assert!(!frame.is_valid());
        assert_eq!(
            validate(&frame),
            Err(Error::ChecksumMismatch {
                expected: 0x9e,
                actual: 0xa0
            })
        );
    }

    #[test]
    fn single_bit_flip_is_rejected() {
        let valid = [0x02, 0x8C, 0x01, 0x11, 0xA0];
        for byte in 0..Frame::LEN {
            for bit in 0..8 {
                let mut bytes = valid;
                bytes[byte] ^= 1 << bit;
                assert!(validate(&Frame::new(bytes)).is_err(), "{bytes:02x?}");
            }
        }
    }
}
