//! One complete DHT transaction: start pulse, 40 bits, release.
//!
//! The waveform itself runs on a [`Transport`], on target the PIO program from
//! [`crate::pio`]. A [`Session`] drives one transport through a read and makes
//! sure it is stopped afterwards, whatever the outcome.
use core::{future::Future, time::Duration};

use embedded_hal_async::delay::DelayNs;
use futures::{
    future::{select, Either},
    pin_mut,
};

use crate::decode::dht::{self, Frame, Model, Reading};

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Hold ticks giving DHT11 its 18ms start pulse.
pub const DHT11_HOLD_TICKS: u32 = 969;
/// Hold ticks giving DHT22 its 1ms start pulse.
pub const DHT22_HOLD_TICKS: u32 = 54;

/// Returns the start pulse length for a model, in hold ticks.
#[must_use]
pub const fn hold_ticks(model: Model) -> u32 {
    match model {
        Model::Dht11 => DHT11_HOLD_TICKS,
        Model::Dht22 => DHT22_HOLD_TICKS,
    }
}

/// Represents a session error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The sensor didn't deliver a full frame in time.
    #[error("read timed out")]
    Timeout,
    /// A full frame arrived but is corrupt.
    #[error("invalid frame: {0}")]
    Decode(dht::Error),
    /// The transport failed.
    #[error("transport error")]
    Transport(E),
}

/// A bit-level channel to one sensor.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error;

    /// Arms the waveform and triggers it with a start pulse of `hold_ticks`.
    async fn start(&mut self, hold_ticks: u32) -> core::result::Result<(), Self::Error>;

    /// Waits for the next byte of the frame.
    async fn read_byte(&mut self) -> core::result::Result<u8, Self::Error>;

    /// Halts the waveform, leaving the line released.
    fn stop(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    async fn start(&mut self, hold_ticks: u32) -> core::result::Result<(), Self::Error> {
        (**self).start(hold_ticks).await
    }

    async fn read_byte(&mut self) -> core::result::Result<u8, Self::Error> {
        (**self).read_byte().await
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// Drives reads over a transport.
#[derive(Debug)]
pub struct Session<T, D> {
    transport: T,
    delay: D,
    model: Model,
    timeout: Option<Duration>,
}

impl<T: Transport, D: DelayNs> Session<T, D> {
    /// Creates a session. Reads giving no frame within `timeout` fail with
    /// [`Error::Timeout`]; with `None` they wait for as long as it takes.
    pub fn new(transport: T, delay: D, model: Model, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            delay,
            model,
            timeout,
        }
    }

    #[must_use]
    pub fn model(&self) -> Model {
        self.model
    }

    /// Performs one transaction and returns the raw frame, unvalidated.
    ///
    /// The transport is stopped before this returns, on every path.
    pub async fn perform_read(&mut self) -> Result<Frame, T::Error> {
        let hold_ticks = hold_ticks(self.model);
        debug!("dht read, start pulse of {} ticks", hold_ticks);

        let frame = match self.timeout {
            Some(limit) => race(
                collect(&mut self.transport, hold_ticks),
                self.delay.delay_ms(millis(limit)),
            )
            .await
            .unwrap_or(Err(Error::Timeout)),
            None => collect(&mut self.transport, hold_ticks).await,
        };
        self.transport.stop();

        if let Ok(frame) = &frame {
            trace!("dht frame: {:02x}", **frame);
        }
        frame
    }

    /// Reads, validates and decodes one frame.
    pub async fn read(&mut self) -> Result<Reading, T::Error> {
        let frame = self.perform_read().await.map_err(|e| {
            match e {
                Error::Timeout => warn!("dht read timed out"),
                _ => warn!("dht transport failed"),
            }
            e
        })?;

        let reading = dht::decode(&frame, self.model).map_err(|e| {
            let dht::Error::ChecksumMismatch { expected, actual } = e;
            warn!(
                "dht checksum mismatch (expected {:#04x}, found {:#04x})",
                expected, actual
            );
            Error::Decode(e)
        })?;
        Ok(reading)
    }

    /// Waits for `duration` on the session's delay.
    pub async fn pause(&mut self, duration: Duration) {
        self.delay.delay_ms(millis(duration)).await;
    }
}

async fn collect<T: Transport>(transport: &mut T, hold_ticks: u32) -> Result<Frame, T::Error> {
    transport
        .start(hold_ticks)
        .await
        .map_err(Error::Transport)?;

    let mut bytes = [0; Frame::LEN];
    for byte in &mut bytes {
        *byte = transport.read_byte().await.map_err(Error::Transport)?;
    }
    Ok(Frame::new(bytes))
}

/// Runs `work` until it completes or `deadline` fires, whichever is first.
/// `work` is polled first on every wake.
async fn race<W: Future, L: Future>(work: W, deadline: L) -> Option<W::Output> {
    pin_mut!(work);
    pin_mut!(deadline);
    match select(work, deadline).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}

/// Converts a duration to whole milliseconds, saturating.
pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
