//! Clock face: time, indoor temperature and today's weather.
//!
//! ```txt
//! ┌──────────────────────────────┐
//! │  ┌────┐      12:34           │
//! │  │ ☼  │                      │
//! │  └────┘      23.5 C          │
//! └──────────────────────────────┘
//! ```
use core::{
    fmt::{self, Write},
    time::Duration,
};

use heapless::String;
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::units::ThermodynamicTemperature;

pub mod weather;

use weather::{ForecastSource, Glyph};

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Represents a rendering error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The text didn't fit its buffer.
    #[error("text overflow")]
    Overflow,
    /// The display failed.
    #[error("display error")]
    Display(E),
}

impl<E> From<fmt::Error> for Error<E> {
    fn from(_: fmt::Error) -> Self {
        Self::Overflow
    }
}

/// An RGB565 colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Deref)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color(u16);

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u16 & 0xf8) << 8) | ((g as u16 & 0xfc) << 3) | (b as u16 >> 3))
    }
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const GRAY: Color = Color::rgb(127, 127, 127);
pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const BLUE: Color = Color::rgb(0, 0, 255);
pub const YELLOW: Color = Color::rgb(255, 216, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Font {
    /// Proportional text font.
    Text,
    /// Weather glyphs, indexed by [`Glyph::code`].
    Weather,
}

/// A framebuffered display.
pub trait Display {
    type Error;

    fn fill(&mut self, color: Color) -> core::result::Result<(), Self::Error>;

    fn print(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        font: Font,
        fg: Color,
        bg: Color,
    ) -> core::result::Result<(), Self::Error>;

    /// Pushes the framebuffer to the panel.
    fn show(&mut self) -> core::result::Result<(), Self::Error>;
}

/// Wall clock hour and minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
}

impl LocalTime {
    /// Converts UNIX seconds to the local time at `utc_offset` seconds from UTC.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unix(seconds: i64, utc_offset: i32) -> Self {
        let of_day = (seconds + i64::from(utc_offset)).rem_euclid(24 * 60 * 60);
        Self {
            hour: (of_day / 3600) as u8,
            minute: (of_day % 3600 / 60) as u8,
        }
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Draws one frame of the clock face.
pub fn render<D: Display>(
    display: &mut D,
    time: Option<LocalTime>,
    temperature: ThermodynamicTemperature,
    weather: Option<Glyph>,
) -> Result<(), D::Error> {
    let mut clock = String::<8>::new();
    match time {
        Some(time) => write!(clock, "{time}")?,
        None => clock.push_str("--:--").map_err(|()| Error::Overflow)?,
    }

    let mut temp = String::<16>::new();
    write!(temp, "{:.1} C", temperature.get::<degree_celsius>())?;

    display.fill(BLUE).map_err(Error::Display)?;
    display
        .print(80, 10, &clock, Font::Text, WHITE, BLUE)
        .map_err(Error::Display)?;
    display
        .print(80, 40, &temp, Font::Text, GRAY, BLUE)
        .map_err(Error::Display)?;
    if let Some(glyph) = weather {
        let mut buf = [0; 4];
        let text = glyph.char().encode_utf8(&mut buf);
        display
            .print(20, 4, text, Font::Weather, glyph.fg, glyph.bg)
            .map_err(Error::Display)?;
    }
    display.show().map_err(Error::Display)
}

/// Clock face state between frames.
#[derive(Debug)]
pub struct Face {
    utc_offset: i32,
    weather_refresh: i64,
    next_weather: i64,
    weather: Option<Glyph>,
}

impl Face {
    /// Creates a face whose first forecast is due at `now`. Times are UNIX
    /// seconds.
    #[must_use]
    pub fn new(utc_offset: i32, weather_refresh: Duration, now: i64) -> Self {
        Self {
            utc_offset,
            weather_refresh: i64::try_from(weather_refresh.as_secs()).unwrap_or(i64::MAX),
            next_weather: now,
            weather: None,
        }
    }

    #[must_use]
    pub fn weather(&self) -> Option<Glyph> {
        self.weather
    }

    /// Fetches a forecast if one is due. A failed fetch keeps the current
    /// glyph until the next period.
    pub async fn update<S: ForecastSource>(&mut self, now: i64, source: &mut S) {
        if now < self.next_weather {
            return;
        }

        match source.fetch_forecast().await {
            Ok(forecast) => {
                debug!("weather code: {}", forecast.code);
                self.weather = forecast.glyph(now);
            }
            Err(_) => warn!("forecast unavailable"),
        }
        self.next_weather = self.next_weather.saturating_add(self.weather_refresh);
    }

    /// Draws a frame, with the time of day when `now` is known.
    pub fn draw<D: Display>(
        &self,
        display: &mut D,
        now: Option<i64>,
        temperature: ThermodynamicTemperature,
    ) -> Result<(), D::Error> {
        let time = now.map(|now| LocalTime::from_unix(now, self.utc_offset));
        render(display, time, temperature, self.weather)
    }
}
