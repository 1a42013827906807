//! Test doubles for the sensor session and read cache.
use std::{cell::Cell, collections::VecDeque, vec::Vec};

use embedded_hal_async::delay::DelayNs;

use crate::{dht::Monotonic, session::Transport};

/// How a scripted transport answers one read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Hands out these bytes.
    Frame([u8; 5]),
    /// Never produces a byte.
    Hang,
    /// Fails the first byte.
    Fault,
}

/// Error raised by [`Attempt::Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

/// A transport answering each read attempt from a script. Reading past the
/// end of the script panics.
#[derive(Debug, Default)]
pub struct Scripted {
    attempts: VecDeque<Attempt>,
    current: Option<Attempt>,
    index: usize,
    /// Hold tick counts passed to every `start`.
    pub starts: Vec<u32>,
    /// Number of `stop` calls.
    pub stops: usize,
}

impl Scripted {
    pub fn new(attempts: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            attempts: attempts.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Transport for Scripted {
    type Error = Fault;

    async fn start(&mut self, hold_ticks: u32) -> Result<(), Fault> {
        self.starts.push(hold_ticks);
        self.current = self.attempts.pop_front();
        self.index = 0;
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<u8, Fault> {
        match self.current {
            Some(Attempt::Frame(bytes)) => {
                let byte = bytes[self.index];
                self.index += 1;
                Ok(byte)
            }
            Some(Attempt::Fault) => Err(Fault),
            Some(Attempt::Hang) => core::future::pending().await,
            None => panic!("script exhausted after {} starts", self.starts.len()),
        }
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// A millisecond clock moved by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn set(&self, now: u32) {
        self.now.set(now);
    }
}

impl Monotonic for ManualClock {
    fn ticks_ms(&self) -> u32 {
        self.now.get()
    }
}

/// A delay that completes immediately, recording what was asked of it.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    /// Requested delays, in milliseconds.
    pub millis: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.millis.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.millis.push(ms);
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::{decode::dht::Model, session::Session};

    #[test]
    #[should_panic(expected = "script exhausted")]
    fn exhausted_script_panics() {
        let mut transport = Scripted::default();
        block_on(transport.start(0)).ok();
        block_on(transport.read_byte()).ok();
    }

    #[test]
    #[should_panic(expected = "script exhausted")]
    fn reading_past_script_panics() {
        let mut transport = Scripted::new([Attempt::Fault]);
        let mut delay = RecordingDelay::default();
        let mut session = Session::new(&mut transport, &mut delay, Model::Dht22, None);
        block_on(session.read()).ok();
        block_on(session.read()).ok();
    }
}
