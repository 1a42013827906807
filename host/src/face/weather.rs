//! Daily forecast and its weather glyph.
//!
//! Forecasts carry a [WMO weather code], which maps onto a glyph of the
//! weather font along with the colours to draw it in.
//!
//! [WMO weather code]: https://open-meteo.com/en/docs#weathervariables
use super::{Color, BLACK, BLUE, GRAY, WHITE, YELLOW};

/// Today's forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Forecast {
    /// WMO weather code.
    pub code: u8,
    /// Sunrise, in UNIX seconds.
    pub sunrise: i64,
    /// Sunset, in UNIX seconds.
    pub sunset: i64,
}

impl Forecast {
    /// Returns `true` if `now` lies strictly between sunrise and sunset.
    #[must_use]
    pub fn is_day(&self, now: i64) -> bool {
        self.sunrise < now && now < self.sunset
    }

    /// Returns the glyph for this forecast at `now`.
    #[must_use]
    pub fn glyph(&self, now: i64) -> Option<Glyph> {
        glyph(self.code, self.is_day(now))
    }
}

/// A source of forecasts, such as a weather web service.
#[allow(async_fn_in_trait)]
pub trait ForecastSource {
    type Error;

    async fn fetch_forecast(&mut self) -> Result<Forecast, Self::Error>;
}

/// A weather font character and its colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Glyph {
    pub code: u8,
    pub fg: Color,
    pub bg: Color,
}

impl Glyph {
    /// Returns the glyph as the character to print with the weather font.
    #[must_use]
    pub fn char(&self) -> char {
        char::from(self.code)
    }
}

/// Returns the glyph for a weather code, `None` for codes without one.
///
/// The table's columns are indexed by `is_day`: the first variant is drawn at
/// night, the second by day.
#[must_use]
pub fn glyph(code: u8, is_day: bool) -> Option<Glyph> {
    let variants: [(u8, Color); 2] = match code {
        // Clear sky, mainly clear.
        0 | 1 => [(0x0d, YELLOW), (0x2e, WHITE)],
        // Partly cloudy.
        2 => [(0x02, YELLOW), (0x86, WHITE)],
        // Overcast.
        3 => [(0x13, WHITE); 2],
        // Fog.
        45 | 48 => [(0x14, WHITE); 2],
        // Drizzle, freezing drizzle.
        51 | 53 | 55 | 56 | 57 => [(0x17, WHITE); 2],
        // Rain, freezing rain, rain showers.
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => [(0x19, WHITE); 2],
        // Snow, snow grains, snow showers.
        71 | 73 | 75 | 77 | 85 | 86 => [(0x1b, WHITE); 2],
        // Thunderstorm, with or without hail.
        95 | 96 | 99 => [(0x1e, GRAY); 2],
        _ => return None,
    };

    let (code, fg) = variants[usize::from(is_day)];
    Some(Glyph {
        code,
        fg,
        bg: if is_day { BLUE } else { BLACK },
    })
}
