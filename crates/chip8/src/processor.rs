use thiserror::Error;

use super::Bus;
use crate::input::KEY_COUNT;
use crate::memory::{AddressError, FONT_GLYPH_SIZE};

/// default starting point for most Chip8 programs
pub const STARTING_PC: u16 = 0x200;

/// Maximum number of nested subroutine calls.
pub const STACK_SIZE: usize = 16;

/// Fatal conditions that stop the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error("out of bounds memory access at {address:#06X} by the instruction at {program_counter:#06X}")]
    OutOfBoundsMemoryAccess { address: usize, program_counter: u16 },
    #[error("the call at {program_counter:#06X} exceeds the maximum call depth of {}", STACK_SIZE)]
    StackOverflow { program_counter: u16 },
    #[error("return at {program_counter:#06X} with an empty call stack")]
    StackUnderflow { program_counter: u16 },
    #[error("the instruction at {program_counter:#06X} references key {key:#X}, which does not exist")]
    InvalidKey { key: u8, program_counter: u16 },
    #[error("unknown opcode {opcode:#06X} at {program_counter:#06X}")]
    UnknownOpcode { opcode: u16, program_counter: u16 },
    #[error("the processor has halted")]
    Halted,
    #[error("no program has been loaded")]
    NoProgram,
    #[error("failed to generate a random number: {0}")]
    Random(#[from] getrandom::Error),
}

/// Switches between variant behaviours of a few instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// Store the shifted out bit of `8xyE` in VF as `0`/`1` instead of the
    /// raw masked high bit (`0x00`/`0x80`).
    pub normalize_shift_flag: bool,

    /// Advance I past the transferred registers after `Fx55` and `Fx65`.
    pub increment_index_on_transfer: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            normalize_shift_flag: false,
            increment_index_on_transfer: true,
        }
    }
}

/// Describes how the program counter should be updated after
/// executing an instruction. The program counter already points at the
/// following instruction when the update is applied.
enum PCUpdate {
    /// Go directly to the next instruction
    Next,

    /// Skip the next instruction.
    SkipNext,

    /// Jump to the given address.
    Jump(u16),

    /// Fetch the same instruction again on the next cycle.
    Repeat,
}

pub struct Processor {
    /// Vx registers
    pub v: [u8; 16],

    /// Index register
    pub i: u16,

    /// Program counter
    pub pc: u16,

    /// Stack pointer
    pub sp: usize,

    /// Stack memory
    pub stack: [u16; STACK_SIZE],

    pub quirks: Quirks,

    /// The last opcode that has been processed
    pub last_opcode: u16,

    /// The address of the last opcode that has been processed
    pub last_opcode_addr: u16,

    running: bool,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: STARTING_PC,
            sp: 0,
            stack: [0; STACK_SIZE],
            quirks,
            last_opcode: 0,
            last_opcode_addr: 0,
            running: true,
        }
    }

    /// Whether the processor will keep executing instructions.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Restore the power-on state of the processor and of the memory,
    /// graphics and timers on the bus. Quirk settings are kept.
    pub fn reset(&mut self, bus: &mut Bus) {
        *self = Self::with_quirks(self.quirks);
        bus.memory.reset();
        bus.graphics.reset();
        bus.clock.reset();
    }

    /// Fetch, decode and execute exactly one instruction.
    pub fn cycle(&mut self, bus: &mut Bus) -> Result<(), ProcessorError> {
        if !self.running {
            return Err(ProcessorError::Halted);
        }

        self.last_opcode_addr = self.pc;
        // get the next two bytes and combine into one two-byte instruction
        let opcode = bus
            .memory
            .read_word(usize::from(self.pc))
            .map_err(|e| self.out_of_bounds(e))?;
        self.last_opcode = opcode;
        self.pc += 2;

        let update = self.process_opcode(opcode, bus).map_err(|e| {
            // leave pc on the failing instruction
            self.pc = self.last_opcode_addr;
            e
        })?;
        match update {
            PCUpdate::Next => {}
            PCUpdate::SkipNext => self.pc += 2,
            PCUpdate::Jump(addr) => self.pc = addr,
            PCUpdate::Repeat => self.pc = self.last_opcode_addr,
        }
        Ok(())
    }

    /// State of the key named by Vx. Only 0x0 to 0xF are keys.
    fn key_pressed(&self, x: usize, bus: &Bus) -> Result<bool, ProcessorError> {
        let key = self.v[x];
        if usize::from(key) >= KEY_COUNT {
            return Err(ProcessorError::InvalidKey {
                key,
                program_counter: self.last_opcode_addr,
            });
        }
        Ok(bus.keypad.is_pressed(key))
    }

    fn out_of_bounds(&self, error: AddressError) -> ProcessorError {
        ProcessorError::OutOfBoundsMemoryAccess {
            address: error.address,
            program_counter: self.last_opcode_addr,
        }
    }

    fn process_opcode(&mut self, opcode: u16, bus: &mut Bus) -> Result<PCUpdate, ProcessorError> {
        // define some commonly used variables
        let x = usize::from((opcode & 0x0F00) >> 8);
        let y = usize::from((opcode & 0x00F0) >> 4);
        let [_, nn] = opcode.to_be_bytes();
        let nnn = opcode & 0x0FFF;

        let update = match (opcode & 0xF000) >> 12 {
            // 0___
            0x0 => match opcode {
                // 00E0
                0x00E0 => {
                    log::trace!("Clear the screen");
                    bus.graphics.clear();
                    PCUpdate::Next
                }

                // 00EE
                0x00EE => {
                    if self.sp == 0 {
                        return Err(ProcessorError::StackUnderflow {
                            program_counter: self.last_opcode_addr,
                        });
                    }
                    self.sp -= 1;
                    log::trace!("Return to addr {:#06X}", self.stack[self.sp]);
                    PCUpdate::Jump(self.stack[self.sp])
                }

                // 0nnn, machine code routines are not supported
                _ => {
                    log::warn!(
                        "Ignoring instruction {opcode:#06X} at {:#06X}",
                        self.last_opcode_addr
                    );
                    PCUpdate::Next
                }
            },

            // 1nnn
            0x1 => {
                log::trace!("Jump to addr {nnn:#06X}");
                PCUpdate::Jump(nnn)
            }

            // 2nnn
            0x2 => {
                if self.sp >= STACK_SIZE {
                    return Err(ProcessorError::StackOverflow {
                        program_counter: self.last_opcode_addr,
                    });
                }
                self.stack[self.sp] = self.pc;
                self.sp += 1;
                log::trace!("Call subroutine at {nnn:#06X}");
                PCUpdate::Jump(nnn)
            }

            // 3xnn
            0x3 => {
                log::trace!("If V{x:X} ({}) == {nn}, skip next instr", self.v[x]);
                skip_if(self.v[x] == nn)
            }

            // 4xnn
            0x4 => {
                log::trace!("If V{x:X} ({}) != {nn}, skip next instr", self.v[x]);
                skip_if(self.v[x] != nn)
            }

            // 5xy0
            0x5 => {
                log::trace!(
                    "If V{x:X} ({}) == V{y:X} ({}), skip next instr",
                    self.v[x],
                    self.v[y]
                );
                skip_if(self.v[x] == self.v[y])
            }

            // 6xnn
            0x6 => {
                log::trace!("Set V{x:X} to {nn}");
                self.v[x] = nn;
                PCUpdate::Next
            }

            // 7xnn
            0x7 => {
                log::trace!("Add {nn} to V{x:X}");
                self.v[x] = self.v[x].wrapping_add(nn);
                PCUpdate::Next
            }

            // 8___
            0x8 => self.process_alu(opcode, x, y),

            // 9xy0
            0x9 => {
                log::trace!(
                    "If V{x:X} ({}) != V{y:X} ({}), skip next instr",
                    self.v[x],
                    self.v[y]
                );
                skip_if(self.v[x] != self.v[y])
            }

            // Annn
            0xA => {
                log::trace!("Set I register to {nnn:#06X}");
                self.i = nnn;
                PCUpdate::Next
            }

            // Bnnn
            0xB => {
                log::trace!("Jump to {nnn:#06X} + {:#04X}", self.v[0]);
                PCUpdate::Jump(nnn + u16::from(self.v[0]))
            }

            // Cxnn
            0xC => {
                let mut buf = [0u8; 1];
                getrandom::getrandom(&mut buf)?;
                log::trace!("Set V{x:X} to {} [rand] AND {nn:#X}", buf[0]);
                self.v[x] = buf[0] & nn;
                PCUpdate::Next
            }

            // Dxyn
            0xD => {
                let n = usize::from(opcode & 0xF);
                log::trace!(
                    "Draw {n} byte sprite from addr {:#06X} at point ({}, {})",
                    self.i,
                    self.v[x],
                    self.v[y]
                );
                let rows = bus
                    .memory
                    .read_range(usize::from(self.i), n)
                    .map_err(|e| self.out_of_bounds(e))?;
                let collision = bus.graphics.draw_sprite(self.v[x], self.v[y], rows);
                self.v[0xF] = collision.into();
                PCUpdate::Next
            }

            // E___
            0xE => match nn {
                // Ex9E
                0x9E => {
                    let pressed = self.key_pressed(x, bus)?;
                    log::trace!("Skip instr if key V{x:X} pressed ({pressed})");
                    skip_if(pressed)
                }

                // ExA1
                0xA1 => {
                    let pressed = self.key_pressed(x, bus)?;
                    log::trace!("Skip next instr if key V{x:X} not pressed ({})", !pressed);
                    skip_if(!pressed)
                }

                // invalid
                _ => {
                    log::warn!("Invalid EX__ instruction: {opcode:#06X}");
                    PCUpdate::Next
                }
            },

            // F___
            0xF => self.process_misc(opcode, x, bus)?,

            // the top nibble of a u16 can't be anything else
            _ => {
                self.running = false;
                log::error!("Unknown opcode: {opcode:#06X}, halting");
                return Err(ProcessorError::UnknownOpcode {
                    opcode,
                    program_counter: self.last_opcode_addr,
                });
            }
        };
        Ok(update)
    }

    /// Register to register arithmetic, the `8xy_` family.
    ///
    /// The result is written before VF, so VF always ends up holding the flag.
    fn process_alu(&mut self, opcode: u16, x: usize, y: usize) -> PCUpdate {
        let vx = self.v[x];
        let vy = self.v[y];

        match opcode & 0x000F {
            // 8xy0
            0x0 => {
                log::trace!("Set V{x:X} to V{y:X} ({vy})");
                self.v[x] = vy;
            }

            // 8xy1
            0x1 => {
                log::trace!("Set V{x:X} to V{x:X} OR V{y:X} ({vx:02X} OR {vy:02X})");
                self.v[x] = vx | vy;
            }

            // 8xy2
            0x2 => {
                log::trace!("Set V{x:X} to V{x:X} AND V{y:X} ({vx:02X} AND {vy:02X})");
                self.v[x] = vx & vy;
            }

            // 8xy3
            0x3 => {
                log::trace!("Set V{x:X} to V{x:X} XOR V{y:X} ({vx:02X} XOR {vy:02X})");
                self.v[x] = vx ^ vy;
            }

            // 8xy4
            0x4 => {
                let (result, carry) = vx.overflowing_add(vy);
                log::trace!("Set V{x:X} to ({vx} + {vy}), VF = {}", u8::from(carry));
                self.v[x] = result;
                self.v[0xF] = u8::from(carry);
            }

            // 8xy5
            0x5 => {
                let (result, borrow) = vx.overflowing_sub(vy);
                log::trace!("Set V{x:X} to ({vx} - {vy}), VF = {}", u8::from(!borrow));
                self.v[x] = result;
                self.v[0xF] = u8::from(!borrow);
            }

            // 8xy6
            0x6 => {
                log::trace!("V{x:X} shifted one right, VF = {}", vx & 1);
                self.v[x] = vx >> 1;
                self.v[0xF] = vx & 1;
            }

            // 8xy7
            0x7 => {
                let (result, borrow) = vy.overflowing_sub(vx);
                log::trace!("Set V{x:X} to ({vy} - {vx}), VF = {}", u8::from(!borrow));
                self.v[x] = result;
                self.v[0xF] = u8::from(!borrow);
            }

            // 8xyE
            0xE => {
                let flag = if self.quirks.normalize_shift_flag {
                    vx >> 7
                } else {
                    vx & 0x80
                };
                log::trace!("V{x:X} shifted one left, VF = {flag:#04X}");
                self.v[x] = vx << 1;
                self.v[0xF] = flag;
            }

            // invalid
            _ => log::warn!("Invalid 8XY_ instruction: {opcode:#06X}"),
        }
        PCUpdate::Next
    }

    /// Timers, keyboard wait and index register operations, the `Fx__` family.
    fn process_misc(
        &mut self,
        opcode: u16,
        x: usize,
        bus: &mut Bus,
    ) -> Result<PCUpdate, ProcessorError> {
        let base = usize::from(self.i);

        match opcode & 0x00FF {
            // Fx07
            0x07 => {
                log::trace!("Set V{x:X} to delay timer ({})", bus.clock.delay_timer);
                self.v[x] = bus.clock.delay_timer;
            }

            // Fx0A
            0x0A => match bus.keypad.first_pressed() {
                Some(key) => {
                    log::trace!("Store key press {key:#X} in V{x:X}");
                    self.v[x] = key;
                }
                None => {
                    log::trace!("Waiting for a key press for V{x:X}");
                    return Ok(PCUpdate::Repeat);
                }
            },

            // Fx15
            0x15 => {
                log::trace!("Set delay timer to V{x:X} ({})", self.v[x]);
                bus.clock.delay_timer = self.v[x];
            }

            // Fx18
            0x18 => {
                log::trace!("Set sound timer to V{x:X} ({})", self.v[x]);
                bus.clock.set_sound_timer(self.v[x]);
            }

            // Fx1E
            0x1E => {
                log::trace!("Set I to I + V{x:X}");
                self.i = self.i.wrapping_add(u16::from(self.v[x]));
            }

            // Fx29
            0x29 => {
                log::trace!("Set I to addr of sprite digit {}", self.v[x]);
                // font data starts at the very beginning of memory
                self.i = u16::from(self.v[x]) * FONT_GLYPH_SIZE;
            }

            // Fx33
            0x33 => {
                log::trace!("Store BCD of {} starting at I", self.v[x]);
                bus.memory
                    .read_range(base, 3)
                    .map_err(|e| self.out_of_bounds(e))?;
                let digits = [self.v[x] / 100, (self.v[x] / 10) % 10, self.v[x] % 10];
                for (offset, digit) in digits.into_iter().enumerate() {
                    bus.memory
                        .write(base + offset, digit)
                        .map_err(|e| self.out_of_bounds(e))?;
                }
            }

            // Fx55
            0x55 => {
                log::trace!("Store V0 to V{x:X} starting at I");
                bus.memory
                    .read_range(base, x + 1)
                    .map_err(|e| self.out_of_bounds(e))?;
                for r in 0..=x {
                    bus.memory
                        .write(base + r, self.v[r])
                        .map_err(|e| self.out_of_bounds(e))?;
                }
                self.advance_index_after_transfer(x);
            }

            // Fx65
            0x65 => {
                log::trace!("Read memory at I into V0 to V{x:X}");
                let values = bus
                    .memory
                    .read_range(base, x + 1)
                    .map_err(|e| self.out_of_bounds(e))?;
                self.v[..=x].copy_from_slice(values);
                self.advance_index_after_transfer(x);
            }

            // invalid
            _ => log::warn!("Invalid FX__ instruction: {opcode:#06X}"),
        }
        Ok(PCUpdate::Next)
    }

    fn advance_index_after_transfer(&mut self, x: usize) {
        if self.quirks.increment_index_on_transfer {
            // x is a nibble, so this can't truncate
            self.i = self.i.wrapping_add(x as u16 + 1);
        }
    }
}

fn skip_if(condition: bool) -> PCUpdate {
    if condition {
        PCUpdate::SkipNext
    } else {
        PCUpdate::Next
    }
}
