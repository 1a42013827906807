//! DHT request/response waveform, as an RP2040 PIO program.
//!
//! # Program
//!
//! The program runs on its own state machine, independent of the host's
//! timing jitter. Its phases are:
//!
//! - Wait for trigger: block on the TX FIFO for the hold tick count.
//! - Drive low: take the pin as an output, drive it low and spin for
//!   `ticks + 1` iterations of [`CYCLES_PER_TICK`] cycles.
//! - Release: turn the pin back into an input; the pull-up raises the line.
//! - Acknowledge: wait for the sensor's low, high, low response.
//! - Read bit: wait for the line to rise, then sample it every 2 cycles for at
//!   most [`BIT_SAMPLES`] samples. A fall before the countdown ends is a `0`;
//!   outlasting it is a `1`, after which the program waits for the fall.
//! - Emit bit: shift the bit into the ISR. Autopush delivers every 8 bits to
//!   the RX FIFO as one byte.
//!
//! The program never terminates on its own. The host disables the state
//! machine once it has taken 5 bytes.
//!
//! ```txt
//!   hold         release ack          bit 0        bit 1
//! ──┐            ┌─────┐    ┌─────┐    ┌──┐    ┌───────┐
//!   │            │     │    │     │    │  │    │       │
//!   └────────────┘     └────┘     └────┘  └────┘       └──
//!   ticks × 26        80μs  80μs  50μs  28μs  50μs  70μs
//! ```
use pio::{Program, RP2040_MAX_PROGRAM_SIZE};

pub mod emulator;
#[cfg(test)]
pub(crate) mod sim;

/// State machine clock the program's timing is written for.
pub const CLOCK_HZ: u32 = 1_400_000;
/// Cycles spent per iteration of the hold loop, `nop [24]` then `jmp x--`.
pub const CYCLES_PER_TICK: u32 = 26;
/// Number of 2 cycle samples taken before a high level counts as a `1`.
pub const BIT_SAMPLES: u32 = 21;
/// Bits collected per autopush.
pub const PUSH_THRESHOLD: u8 = 8;

/// Assembles the waveform program.
///
/// `set`, `in`, `wait` and `jmp pin` all address the same data pin, so the
/// state machine's set base, in base and jmp pin must point at it.
#[must_use]
pub fn program() -> Program<RP2040_MAX_PROGRAM_SIZE> {
    pio_proc::pio_asm!(
        // Wait for the hold tick count.
        "    pull block",
        "    set pindirs, 1",
        "    set pins, 0",
        "    mov x, osr",
        "hold:",
        "    nop [24]",
        "    jmp x-- hold",
        // Release the line and follow the acknowledgement.
        "    set pindirs, 0",
        "    wait 1 pin 0",
        "    wait 0 pin 0",
        "    wait 1 pin 0",
        "    wait 0 pin 0",
        // Bits.
        "read_bit:",
        "    wait 1 pin 0",
        "    set x, 20",
        "countdown:",
        "    jmp pin bit_high",
        "    set y, 0",
        "    in y, 1",
        "    jmp read_bit",
        "bit_high:",
        "    jmp x-- countdown",
        "    set y, 1",
        "    in y, 1",
        "    wait 0 pin 0",
        "    jmp read_bit",
    )
    .program
}

/// Returns the hold duration in microseconds for a tick count, saturating at
/// `u32::MAX`.
#[must_use]
pub fn hold_micros(ticks: u32) -> u32 {
    let cycles = (u64::from(ticks) + 1) * u64::from(CYCLES_PER_TICK);
    u32::try_from(cycles * 1_000_000 / u64::from(CLOCK_HZ)).unwrap_or(u32::MAX)
}
