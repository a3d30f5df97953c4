use std::sync::atomic::{AtomicBool, Ordering};

/// Number of keys on the CHIP-8 keypad.
pub const KEY_COUNT: usize = 16;

/// Input system for the `Chip8`. This keeps track of the pressed state of all 16 keys.
///
/// Each key is its own atomic cell, so a `Keypad` behind an `Arc` can be updated
/// from an input thread while the interpreter is stepping on another.
#[derive(Default)]
pub struct Keypad {
    state: [AtomicBool; KEY_COUNT],
}

impl Keypad {
    /// Create a new [`Keypad`] with every key released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the input state of the given key code.
    /// Key codes above `0xF` are ignored.
    pub fn set(&self, key_code: u8, pressed: bool) {
        match self.state.get(usize::from(key_code)) {
            Some(cell) => cell.store(pressed, Ordering::SeqCst),
            None => log::debug!("Ignoring state change for unknown key {key_code:#X}"),
        }
    }

    /// Returns whether the given key is currently pressed.
    pub fn is_pressed(&self, key_code: u8) -> bool {
        self.state
            .get(usize::from(key_code))
            .map_or(false, |cell| cell.load(Ordering::SeqCst))
    }

    /// Scan all keys in ascending order and return the last pressed one.
    ///
    /// When several keys are held the highest key code wins.
    pub fn first_pressed(&self) -> Option<u8> {
        let mut found = None;
        for (key_code, cell) in (0u8..).zip(self.state.iter()) {
            if cell.load(Ordering::SeqCst) {
                found = Some(key_code);
            }
        }
        found
    }

    /// Release every key.
    pub fn reset(&self) {
        for cell in &self.state {
            cell.store(false, Ordering::SeqCst);
        }
    }
}
