//! Rate-limited DHT11/DHT22 sensor.
//!
//! The sensors need about 2 seconds between conversions, so [`Dht`] caches the
//! last good reading and only talks to the sensor once it is stale. A failed
//! refresh keeps serving the old reading; only the very first read blocks,
//! retrying until a frame passes validation.
use core::time::Duration;

use embedded_hal_async::delay::DelayNs;

use crate::{
    decode::dht::{Model, Reading},
    session::{self, Session, Transport},
    units::{Ratio, ThermodynamicTemperature},
};

/// A wrapping millisecond tick counter.
pub trait Monotonic {
    fn ticks_ms(&self) -> u32;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn ticks_ms(&self) -> u32 {
        (**self).ticks_ms()
    }
}

/// Sensor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub model: Model,
    /// Minimum time between two reads of the sensor.
    pub min_interval: Duration,
    /// Wait between attempts of the first read.
    pub retry_backoff: Duration,
    /// Supervisory limit on a single read, `None` for no limit.
    pub read_timeout: Option<Duration>,
}

impl Config {
    #[must_use]
    pub const fn new(model: Model) -> Self {
        Self {
            model,
            min_interval: Duration::from_millis(2000),
            retry_backoff: Duration::from_millis(2000),
            read_timeout: Some(Duration::from_millis(100)),
        }
    }

    #[must_use]
    pub const fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    #[must_use]
    pub const fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Cached sensor state.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct State {
    reading: Option<Reading>,
    /// Tick of the last successful read.
    last_read: u32,
}

/// A DHT sensor behind a read cache.
pub struct Dht<T, C, D> {
    session: Session<T, D>,
    clock: C,
    config: Config,
    state: State,
}

impl<T, C, D> Dht<T, C, D>
where
    T: Transport,
    C: Monotonic,
    D: DelayNs,
{
    /// Creates a sensor with the default [`Config`] for `model`.
    pub fn new(transport: T, clock: C, delay: D, model: Model) -> Self {
        Self::with_config(transport, clock, delay, Config::new(model))
    }

    pub fn with_config(transport: T, clock: C, delay: D, config: Config) -> Self {
        Self {
            session: Session::new(transport, delay, config.model, config.read_timeout),
            clock,
            config,
            state: State::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the cached reading without touching the sensor.
    #[must_use]
    pub fn cached(&self) -> Option<Reading> {
        self.state.reading
    }

    /// Returns the tick of the last successful read.
    #[must_use]
    pub fn last_read(&self) -> u32 {
        self.state.last_read
    }

    /// Returns a reading no older than the minimum interval if the sensor
    /// cooperates, else the newest one available.
    ///
    /// Until the first successful read this keeps retrying, with the retry
    /// backoff between attempts.
    pub async fn ensure_fresh(&mut self) -> Reading {
        match self.state.reading {
            None => self.first_read().await,
            Some(reading) => self.refresh(reading).await,
        }
    }

    /// Returns the relative humidity, refreshing it if stale.
    pub async fn humidity(&mut self) -> Ratio {
        self.ensure_fresh().await.humidity
    }

    /// Returns the temperature, refreshing it if stale.
    pub async fn temperature(&mut self) -> ThermodynamicTemperature {
        self.ensure_fresh().await.temperature
    }

    async fn first_read(&mut self) -> Reading {
        loop {
            if let Ok(reading) = self.session.read().await {
                return self.store(reading);
            }
            warn!(
                "dht first read failed, retrying in {}ms",
                session::millis(self.config.retry_backoff)
            );
            self.session.pause(self.config.retry_backoff).await;
        }
    }

    async fn refresh(&mut self, cached: Reading) -> Reading {
        let now = self.clock.ticks_ms();
        if now < self.state.last_read {
            debug!("tick counter wrapped, restarting interval");
            self.state.last_read = now;
            return cached;
        }

        if now - self.state.last_read < session::millis(self.config.min_interval) {
            return cached;
        }

        match self.session.read().await {
            Ok(reading) => self.store(reading),
            Err(_) => {
                debug!("dht refresh failed, serving cached reading");
                cached
            }
        }
    }

    fn store(&mut self, reading: Reading) -> Reading {
        info!("dht refreshed: {}", reading);
        self.state = State {
            reading: Some(reading),
            last_read: self.clock.ticks_ms(),
        };
        reading
    }
}
