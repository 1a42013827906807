#![no_std]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

use defmt::info;
use driver::dht::{self, Config, Model};
use embassy_rp::{
    bind_interrupts, config,
    gpio::{self, Level},
    peripherals,
    pio::{self, Pio},
};

type SensorPio = peripherals::PIO0;
const SENSOR_SM: usize = 0;

pub type Sensor<'a> = dht::Sensor<'a, SensorPio, SENSOR_SM>;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => pio::InterruptHandler<SensorPio>;
});

pub struct Board<'a> {
    pub led: gpio::Output<'a, peripherals::PIN_25>,
    pub sensor: Sensor<'a>,
}

impl<'a> Board<'a> {
    /// Brings up the board with the sensor on GPIO15.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let peripherals = embassy_rp::init(config::Config::default());

        let led = gpio::Output::new(peripherals.PIN_25, Level::Low);

        let Pio {
            mut common, sm0, ..
        } = Pio::new(peripherals.PIO0, Irqs);
        let sensor = dht::sensor(&mut common, sm0, peripherals.PIN_15, config);

        info!("board initialized!");

        Self { led, sensor }
    }

    /// Brings up the board with the default configuration for `model`.
    #[must_use]
    pub fn with_model(model: Model) -> Self {
        Self::new(Config::new(model))
    }
}
