//! Simulated DHT sensor wired to the emulated waveform program.

use super::{
    emulator::{self, Emulator, ShiftConfig, ShiftDirection},
    CLOCK_HZ, PUSH_THRESHOLD,
};
use crate::decode::dht::{Frame, Model};

// Sensor timings, in microseconds.
const RESPONSE_DELAY_US: u64 = 30;
const ACK_LOW_US: u64 = 80;
const ACK_HIGH_US: u64 = 80;
const BIT_LOW_US: u64 = 50;
const ZERO_HIGH_US: u64 = 27;
const ONE_HIGH_US: u64 = 70;

fn cycles(micros: u64) -> u64 {
    micros * u64::from(CLOCK_HZ) / 1_000_000
}

/// A sensor answering start pulses with a fixed frame.
pub struct SimSensor {
    /// Shortest start pulse the sensor answers, `None` for a sensor that never
    /// answers.
    min_low: Option<u64>,
    frame: Frame,
    low_since: Option<u64>,
    /// Level changes of the current response, as `(level, until)`.
    response: Vec<(bool, u64)>,
}

impl SimSensor {
    pub fn new(model: Model, frame: Frame) -> Self {
        let min_low_us = match model {
            Model::Dht11 => 18_000,
            Model::Dht22 => 1_000,
        };
        Self {
            min_low: Some(cycles(min_low_us)),
            frame,
            low_since: None,
            response: Vec::new(),
        }
    }

    /// A sensor that never answers, leaving the line to the pull-up.
    pub fn silent() -> Self {
        Self {
            min_low: None,
            frame: Frame::default(),
            low_since: None,
            response: Vec::new(),
        }
    }

    /// Returns the level the sensor leaves on the line at cycle `now`; `false`
    /// when it pulls the line low.
    pub fn level(&mut self, now: u64, host_low: bool) -> bool {
        if host_low {
            self.low_since.get_or_insert(now);
            self.response.clear();
            return true;
        }

        if let Some(since) = self.low_since.take() {
            if self.min_low.is_some_and(|min| now - since >= min) {
                self.respond(now);
            }
        }

        while let Some(&(level, until)) = self.response.first() {
            if now < until {
                return level;
            }
            self.response.remove(0);
        }
        true
    }

    fn respond(&mut self, now: u64) {
        let mut at = now;
        let mut segment = |level: bool, micros: u64, response: &mut Vec<(bool, u64)>| {
            at += cycles(micros);
            response.push((level, at));
        };

        let mut response = Vec::new();
        segment(true, RESPONSE_DELAY_US, &mut response);
        segment(false, ACK_LOW_US, &mut response);
        segment(true, ACK_HIGH_US, &mut response);
        for &byte in self.frame.iter() {
            for bit in (0..8).rev() {
                segment(false, BIT_LOW_US, &mut response);
                let high = if byte & (1 << bit) == 0 {
                    ZERO_HIGH_US
                } else {
                    ONE_HIGH_US
                };
                segment(true, high, &mut response);
            }
        }
        segment(false, BIT_LOW_US, &mut response);
        self.response = response;
    }
}

/// The waveform program on an emulated state machine, sharing an open-drain
/// line with a simulated sensor.
pub struct Bench {
    pub machine: Emulator,
    pub sensor: SimSensor,
}

impl Bench {
    pub fn new(sensor: SimSensor) -> emulator::Result<Self> {
        let shift_in = ShiftConfig {
            auto_push: true,
            threshold: PUSH_THRESHOLD,
            direction: ShiftDirection::Left,
        };
        Ok(Self {
            machine: Emulator::new(&super::program(), shift_in)?,
            sensor,
        })
    }

    /// Steps one cycle, returning the line level seen during it.
    pub fn step(&mut self) -> bool {
        let host_low = self.machine.drives_low();
        let sensor_high = self.sensor.level(self.machine.cycles(), host_low);
        let line_high = sensor_high && !host_low;
        self.machine.step(line_high);
        line_high
    }

    /// Steps until a byte arrives, giving up after `limit` cycles.
    pub fn run_until_byte(&mut self, limit: u64) -> Option<u8> {
        for _ in 0..limit {
            if let Some(word) = self.machine.pull() {
                #[allow(clippy::cast_possible_truncation)]
                return Some(word as u8);
            }
            self.step();
        }
        None
    }
}
