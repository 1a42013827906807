//! DHT11/DHT22 sensor on a PIO state machine.
//!
//! The whole request/response waveform runs in [`smart_clock::pio::program`];
//! the CPU only triggers it and drains the RX FIFO a byte at a time. The data
//! pin needs a pull-up, the internal one is enabled here.
use defmt::{debug, trace};
use embassy_rp::{
    clocks,
    gpio::Pull,
    pio::{self, Common, Direction, Instance, PioPin, ShiftDirection, StateMachine},
    Peripheral,
};
use embassy_time::{Delay, Instant};
use fixed::traits::ToFixed;
pub use smart_clock::{
    decode::dht::{Model, Reading},
    dht::Config,
};
use smart_clock::{
    dht::{Dht, Monotonic},
    pio::{program, CLOCK_HZ, PUSH_THRESHOLD},
    session::Transport,
};

/// Represents a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, defmt::Format)]
pub enum Error {
    /// The trigger didn't fit the TX FIFO.
    #[error("state machine busy")]
    Busy,
}

/// A DHT sensor read through PIO state machine `SM`.
pub type Sensor<'d, P, const SM: usize> = Dht<PioTransport<'d, P, SM>, SystemTicks, Delay>;

/// Creates a sensor on `pin`, loading the waveform program into `common`.
pub fn sensor<'d, P: Instance, const SM: usize>(
    common: &mut Common<'d, P>,
    sm: StateMachine<'d, P, SM>,
    pin: impl Peripheral<P = impl PioPin + 'd> + 'd,
    config: Config,
) -> Sensor<'d, P, SM> {
    Dht::with_config(PioTransport::new(common, sm, pin), SystemTicks, Delay, config)
}

/// Runs the waveform program on one state machine.
pub struct PioTransport<'d, P: Instance, const SM: usize> {
    sm: StateMachine<'d, P, SM>,
    pin: pio::Pin<'d, P>,
    config: pio::Config<'d, P>,
}

impl<'d, P: Instance, const SM: usize> PioTransport<'d, P, SM> {
    pub fn new(
        common: &mut Common<'d, P>,
        sm: StateMachine<'d, P, SM>,
        pin: impl Peripheral<P = impl PioPin + 'd> + 'd,
    ) -> Self {
        let program = common.load_program(&program());
        let mut pin = common.make_pio_pin(pin);
        pin.set_pull(Pull::Up);

        let mut config = pio::Config::default();
        config.use_program(&program, &[]);
        config.set_set_pins(&[&pin]);
        config.set_in_pins(&[&pin]);
        config.set_jmp_pin(&pin);
        config.clock_divider = (f64::from(clocks::clk_sys_freq()) / f64::from(CLOCK_HZ)).to_fixed();
        config.shift_in.auto_fill = true;
        config.shift_in.threshold = PUSH_THRESHOLD;
        config.shift_in.direction = ShiftDirection::Left;
        debug!("dht program loaded, clock divider {}", config.clock_divider.to_num::<f32>());

        let mut transport = Self { sm, pin, config };
        transport.stop();
        transport
    }
}

impl<'d, P: Instance, const SM: usize> Transport for PioTransport<'d, P, SM> {
    type Error = Error;

    async fn start(&mut self, hold_ticks: u32) -> Result<(), Error> {
        self.sm.set_config(&self.config);
        self.sm.clear_fifos();
        self.sm.restart();
        self.sm.set_enable(true);
        if self.sm.tx().try_push(hold_ticks) {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    async fn read_byte(&mut self) -> Result<u8, Error> {
        let word = self.sm.rx().wait_pull().await;
        trace!("dht rx: {:#010x}", word);
        #[allow(clippy::cast_possible_truncation)]
        let byte = word as u8;
        Ok(byte)
    }

    fn stop(&mut self) {
        self.sm.set_enable(false);
        self.sm.clear_fifos();
        self.sm.set_pin_dirs(Direction::In, &[&self.pin]);
    }
}

/// Milliseconds since boot, wrapping at `u32::MAX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTicks;

impl Monotonic for SystemTicks {
    fn ticks_ms(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let ticks = Instant::now().as_millis() as u32;
        ticks
    }
}
