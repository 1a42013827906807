//! Cycle-level emulator for single pin PIO programs.
//!
//! Executes assembled RP2040 PIO instructions one state machine cycle at a
//! time against one open-drain data pin: `set`/`mov` to `pins` and `pindirs`
//! drive it, `wait`, `in` and `jmp pin` read it. It exists to check the
//! waveform program's timing against a simulated sensor off-target.
//!
//! Supported: `jmp` (except `!osre`), `wait` on pin or gpio index 0, `in`,
//! `push`, `pull`, `mov` (except `exec` and `status`) and `set`, with delays,
//! wrapping and autopush. Side-set is not supported.
//!
//! See: [RP2040 datasheet] § 3.4.
//!
//! [RP2040 datasheet]: https://datasheets.raspberrypi.com/rp2040/rp2040-datasheet.pdf
use heapless::{Deque, Vec};
use pio::{Program, RP2040_MAX_PROGRAM_SIZE};

pub type Result<T> = core::result::Result<T, Error>;

/// Depth of each FIFO.
pub const FIFO_DEPTH: usize = 4;

/// Represents an emulator error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The program uses an instruction the emulator does not model.
    #[error("unsupported instruction {instruction:#06x} at {address}")]
    UnsupportedInstruction { address: u8, instruction: u16 },
    /// The program uses side-set.
    #[error("side-set is not supported")]
    SideSet,
}

/// ISR shift direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// Input shift register configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftConfig {
    pub auto_push: bool,
    /// Bit count that triggers an autopush, `1..=32`.
    pub threshold: u8,
    pub direction: ShiftDirection,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            auto_push: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Always,
    XZero,
    XPostDecrement,
    YZero,
    YPostDecrement,
    XNotEqualY,
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Pins,
    X,
    Y,
    Null,
    Isr,
    Osr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Pins,
    PinDirs,
    X,
    Y,
    Pc,
    Isr,
    Osr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovOp {
    None,
    Invert,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Jmp { condition: Condition, address: u8 },
    Wait { polarity: bool },
    In { source: Source, count: u8 },
    Push { block: bool },
    Pull { block: bool },
    Mov { destination: Destination, op: MovOp, source: Source },
    Set { destination: Destination, data: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Instruction {
    op: Op,
    delay: u8,
}

enum Outcome {
    Stall,
    Next,
    Jump(u8),
}

/// A single PIO state machine bound to one open-drain pin.
pub struct Emulator {
    code: Vec<Instruction, RP2040_MAX_PROGRAM_SIZE>,
    wrap_source: u8,
    wrap_target: u8,
    shift_in: ShiftConfig,
    pc: u8,
    delay: u8,
    x: u32,
    y: u32,
    osr: u32,
    isr: u32,
    isr_count: u8,
    tx: Deque<u32, FIFO_DEPTH>,
    rx: Deque<u32, FIFO_DEPTH>,
    pin_output: bool,
    pin_level: bool,
    cycles: u64,
}

impl Emulator {
    /// Loads a program. Fails if it uses anything the emulator does not model.
    pub fn new(program: &Program<RP2040_MAX_PROGRAM_SIZE>, shift_in: ShiftConfig) -> Result<Self> {
        if program.side_set.bits() > 0 {
            return Err(Error::SideSet);
        }

        let mut code = Vec::new();
        for (address, instruction) in program.code.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let address = address as u8;
            let decoded = decode_instruction(*instruction).ok_or(Error::UnsupportedInstruction {
                address,
                instruction: *instruction,
            })?;
            // Programs are at most 32 instructions long.
            let _ = code.push(decoded);
        }

        Ok(Self {
            code,
            wrap_source: program.wrap.source,
            wrap_target: program.wrap.target,
            shift_in,
            pc: 0,
            delay: 0,
            x: 0,
            y: 0,
            osr: 0,
            isr: 0,
            isr_count: 0,
            tx: Deque::new(),
            rx: Deque::new(),
            pin_output: false,
            pin_level: false,
            cycles: 0,
        })
    }

    /// Pushes a word into the TX FIFO. Returns `false` if it is full.
    pub fn push(&mut self, word: u32) -> bool {
        self.tx.push_back(word).is_ok()
    }

    /// Pulls a word from the RX FIFO.
    pub fn pull(&mut self) -> Option<u32> {
        self.rx.pop_front()
    }

    /// Returns `true` while the machine drives the line low.
    #[must_use]
    pub fn drives_low(&self) -> bool {
        self.pin_output && !self.pin_level
    }

    /// Returns the number of cycles stepped so far.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Returns the program counter.
    #[must_use]
    pub fn pc(&self) -> u8 {
        self.pc
    }

    /// Advances one cycle with the line at the given level. Returns
    /// [`Emulator::drives_low`] after the cycle.
    pub fn step(&mut self, line_high: bool) -> bool {
        self.cycles += 1;

        if self.delay > 0 {
            self.delay -= 1;
            return self.drives_low();
        }

        let Instruction { op, delay } = self.code[usize::from(self.pc)];
        match self.execute(op, line_high) {
            Outcome::Stall => {}
            Outcome::Next => {
                self.pc = if self.pc == self.wrap_source {
                    self.wrap_target
                } else {
                    self.pc + 1
                };
                self.delay = delay;
            }
            Outcome::Jump(address) => {
                self.pc = address;
                self.delay = delay;
            }
        }

        self.drives_low()
    }

    fn execute(&mut self, op: Op, line_high: bool) -> Outcome {
        match op {
            Op::Jmp { condition, address } => {
                let taken = match condition {
                    Condition::Always => true,
                    Condition::XZero => self.x == 0,
                    Condition::YZero => self.y == 0,
                    Condition::XPostDecrement => {
                        let taken = self.x != 0;
                        self.x = self.x.wrapping_sub(1);
                        taken
                    }
                    Condition::YPostDecrement => {
                        let taken = self.y != 0;
                        self.y = self.y.wrapping_sub(1);
                        taken
                    }
                    Condition::XNotEqualY => self.x != self.y,
                    Condition::Pin => line_high,
                };
                if taken {
                    Outcome::Jump(address)
                } else {
                    Outcome::Next
                }
            }
            Op::Wait { polarity } => {
                if line_high == polarity {
                    Outcome::Next
                } else {
                    Outcome::Stall
                }
            }
            Op::In { source, count } => {
                let count = if count == 0 { 32 } else { count };
                let fills = self.shift_in.auto_push
                    && self.isr_count.saturating_add(count) >= self.shift_in.threshold;
                if fills && self.rx.is_full() {
                    return Outcome::Stall;
                }

                let data = self.read(source, line_high);
                self.shift_into_isr(data, count);
                if fills {
                    // Checked for space above.
                    let _ = self.rx.push_back(self.isr);
                    self.isr = 0;
                    self.isr_count = 0;
                }
                Outcome::Next
            }
            Op::Push { block } => {
                if self.rx.is_full() {
                    if block {
                        return Outcome::Stall;
                    }
                } else {
                    let _ = self.rx.push_back(self.isr);
                }
                self.isr = 0;
                self.isr_count = 0;
                Outcome::Next
            }
            Op::Pull { block } => {
                match self.tx.pop_front() {
                    Some(word) => self.osr = word,
                    None if block => return Outcome::Stall,
                    // A non-blocking pull from an empty FIFO copies X.
                    None => self.osr = self.x,
                }
                Outcome::Next
            }
            Op::Mov {
                destination,
                op,
                source,
            } => {
                let value = self.read(source, line_high);
                let value = match op {
                    MovOp::None => value,
                    MovOp::Invert => !value,
                    MovOp::Reverse => value.reverse_bits(),
                };
                self.write(destination, value)
            }
            Op::Set { destination, data } => self.write(destination, u32::from(data)),
        }
    }

    fn read(&self, source: Source, line_high: bool) -> u32 {
        match source {
            Source::Pins => u32::from(line_high),
            Source::X => self.x,
            Source::Y => self.y,
            Source::Null => 0,
            Source::Isr => self.isr,
            Source::Osr => self.osr,
        }
    }

    fn write(&mut self, destination: Destination, value: u32) -> Outcome {
        match destination {
            Destination::Pins => self.pin_level = value & 1 == 1,
            Destination::PinDirs => self.pin_output = value & 1 == 1,
            Destination::X => self.x = value,
            Destination::Y => self.y = value,
            Destination::Isr => {
                self.isr = value;
                self.isr_count = 0;
            }
            Destination::Osr => self.osr = value,
            #[allow(clippy::cast_possible_truncation)]
            Destination::Pc => return Outcome::Jump((value & 0x1f) as u8),
        }
        Outcome::Next
    }

    fn shift_into_isr(&mut self, data: u32, count: u8) {
        if count >= 32 {
            self.isr = data;
        } else {
            let data = data & ((1 << count) - 1);
            self.isr = match self.shift_in.direction {
                ShiftDirection::Left => (self.isr << count) | data,
                ShiftDirection::Right => (self.isr >> count) | (data << (32 - count)),
            };
        }
        self.isr_count = self.isr_count.saturating_add(count).min(32);
    }
}

/// Decodes an instruction word.
///
/// ```txt
///  15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
/// +--------+--------------+--------+--------------+
/// | opcode | delay        | arg 1  | arg 2        |
/// +--------+--------------+--------+--------------+
/// ```
fn decode_instruction(word: u16) -> Option<Instruction> {
    #[allow(clippy::cast_possible_truncation)]
    let delay = ((word >> 8) & 0x1f) as u8;
    #[allow(clippy::cast_possible_truncation)]
    let arg1 = ((word >> 5) & 0x7) as u8;
    #[allow(clippy::cast_possible_truncation)]
    let arg2 = (word & 0x1f) as u8;

    let op = match word >> 13 {
        0b000 => Op::Jmp {
            condition: match arg1 {
                0b000 => Condition::Always,
                0b001 => Condition::XZero,
                0b010 => Condition::XPostDecrement,
                0b011 => Condition::YZero,
                0b100 => Condition::YPostDecrement,
                0b101 => Condition::XNotEqualY,
                0b110 => Condition::Pin,
                _ => return None,
            },
            address: arg2,
        },
        0b001 => {
            // Pin and gpio sources only, and only the bound pin.
            let source = (word >> 5) & 0b11;
            if source > 0b01 || arg2 != 0 {
                return None;
            }
            Op::Wait {
                polarity: word & (1 << 7) != 0,
            }
        }
        0b010 => Op::In {
            source: source(arg1)?,
            count: arg2,
        },
        0b100 => {
            let block = word & (1 << 5) != 0;
            if word & (1 << 7) == 0 {
                Op::Push { block }
            } else {
                Op::Pull { block }
            }
        }
        0b101 => Op::Mov {
            #[allow(clippy::cast_possible_truncation)]
            source: source((word & 0b111) as u8)?,
            destination: match arg1 {
                0b000 => Destination::Pins,
                0b001 => Destination::X,
                0b010 => Destination::Y,
                0b101 => Destination::Pc,
                0b110 => Destination::Isr,
                0b111 => Destination::Osr,
                _ => return None,
            },
            op: match (word >> 3) & 0b11 {
                0b00 => MovOp::None,
                0b01 => MovOp::Invert,
                0b10 => MovOp::Reverse,
                _ => return None,
            },
        },
        0b111 => Op::Set {
            destination: match arg1 {
                0b000 => Destination::Pins,
                0b001 => Destination::X,
                0b010 => Destination::Y,
                0b100 => Destination::PinDirs,
                _ => return None,
            },
            data: arg2,
        },
        _ => return None,
    };

    Some(Instruction { op, delay })
}

fn source(bits: u8) -> Option<Source> {
    Some(match bits {
        0b000 => Source::Pins,
        0b001 => Source::X,
        0b010 => Source::Y,
        0b011 => Source::Null,
        0b110 => Source::Isr,
        0b111 => Source::Osr,
        _ => return None,
    })
}
