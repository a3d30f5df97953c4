use std::ops::{Index, IndexMut};

use thiserror::Error;

/// Total size of the Chip8 memory.
pub const MEMORY_SIZE: usize = 4096;

/// The size of the interpreter.
///
/// This is really only used to determine where
/// the program memory should start.
pub const INTERPRETER_SIZE: usize = 512;

/// Largest program that fits between the interpreter area and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - INTERPRETER_SIZE;

/// Built in Chip8 font data. This will be stored in the
/// interpreter's memory.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Bytes per glyph in [`FONT`].
pub const FONT_GLYPH_SIZE: u16 = 5;

/// Reasons a program can be rejected by [`Memory::load_program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("the program is empty")]
    EmptyProgram,
    #[error("a program of {len:#X} bytes exceeds the {max:#X} bytes available from 0x200")]
    ProgramTooLarge { len: usize, max: usize },
    #[error("a program is already loaded, reset the machine before loading another")]
    AlreadyLoaded,
}

/// An access outside of `0x000..=0xFFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("address {address:#06X} is outside of the {:#X} byte memory", MEMORY_SIZE)]
pub struct AddressError {
    pub address: usize,
}

/// The memory of the `Chip8`.
pub struct Memory {
    memory: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);
        Self { memory }
    }
}

impl Memory {
    /// Create a new `Memory` object, zeroed apart from the font.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the program bytes from `data` into memory, starting at `0x200`.
    ///
    /// Memory past the end of the program is left untouched.
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if data.is_empty() {
            return Err(LoadError::EmptyProgram);
        }
        if data.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::ProgramTooLarge {
                len: data.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }

        self.memory[INTERPRETER_SIZE..INTERPRETER_SIZE + data.len()].copy_from_slice(data);
        log::debug!("Loaded {} program bytes at {INTERPRETER_SIZE:#05X}", data.len());
        Ok(())
    }

    /// Zero the whole memory and write the font back to the start of it.
    pub fn reset(&mut self) {
        self.memory.fill(0);
        self.memory[..FONT.len()].copy_from_slice(&FONT);
    }

    pub fn read(&self, address: usize) -> Result<u8, AddressError> {
        self.memory
            .get(address)
            .copied()
            .ok_or(AddressError { address })
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), AddressError> {
        let cell = self
            .memory
            .get_mut(address)
            .ok_or(AddressError { address })?;
        *cell = value;
        Ok(())
    }

    /// Borrow `len` bytes starting at `address`.
    ///
    /// Fails with the first address that falls outside of memory.
    pub fn read_range(&self, address: usize, len: usize) -> Result<&[u8], AddressError> {
        let end = address + len;
        if end > MEMORY_SIZE {
            return Err(AddressError {
                address: address.max(MEMORY_SIZE),
            });
        }
        Ok(&self.memory[address..end])
    }

    /// Read the big-endian instruction word at `address`.
    pub fn read_word(&self, address: usize) -> Result<u16, AddressError> {
        let bytes = self.read_range(address, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl Index<usize> for Memory {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.memory[index]
    }
}

impl IndexMut<usize> for Memory {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.memory[index]
    }
}
