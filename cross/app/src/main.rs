#![no_std]
#![no_main]

use board::Board;
use defmt::{info, warn};
use driver::dht::Model;
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use smart_clock::face::Face;
use uom::si::thermodynamic_temperature::degree_celsius;
use {defmt_rtt as _, panic_probe as _};

mod console;

use console::ConsoleDisplay;

/// Time between clock face updates.
const CLOCK_REFRESH: Duration = Duration::from_secs(20);
/// Time between forecast fetches.
const WEATHER_REFRESH: core::time::Duration = core::time::Duration::from_secs(5 * 60);
/// Local time offset from UTC, in seconds.
const UTC_OFFSET: i32 = -3 * 60 * 60;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let mut board = Board::with_model(Model::Dht11);
    let mut display = ConsoleDisplay;
    // No wall clock or forecast source on this build, so the face runs
    // without time and weather.
    let face = Face::new(UTC_OFFSET, WEATHER_REFRESH, 0);
    info!("clock started!");

    let mut is_led_on = false;
    loop {
        is_led_on = !is_led_on;
        match is_led_on {
            true => board.led.set_high(),
            false => board.led.set_low(),
        }

        let temperature = board.sensor.temperature().await;
        info!("temperature: {}°C", temperature.get::<degree_celsius>());

        if let Err(e) = face.draw(&mut display, None, temperature) {
            warn!("render failed: {}", e);
        }

        Timer::after(CLOCK_REFRESH).await;
    }
}
