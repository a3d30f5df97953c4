use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use chip8::{Keypad, KEY_COUNT};

use crate::keymap;

/// How long a tapped key stays down before it is released again.
pub const TAP_DURATION: Duration = Duration::from_millis(250);

/// A single key command typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// `+name`, hold the key down.
    Press(u8),
    /// `-name`, release the key.
    Release(u8),
    /// `name`, press the key and release it after [`TAP_DURATION`].
    Tap(u8),
}

impl KeyCommand {
    /// Parse a single word. Returns `None` for unknown key names.
    pub fn parse(word: &str) -> Option<Self> {
        if let Some(name) = word.strip_prefix('+') {
            keymap::key_code(name).map(Self::Press)
        } else if let Some(name) = word.strip_prefix('-') {
            keymap::key_code(name).map(Self::Release)
        } else {
            keymap::key_code(word).map(Self::Tap)
        }
    }
}

/// Applies key commands to a shared keypad.
///
/// Every press bumps a per-key counter, so the delayed release of a tap
/// leaves a key alone that was pressed again in the meantime.
#[derive(Clone)]
pub struct KeyInput {
    keypad: Arc<Keypad>,
    presses: Arc<[AtomicU32; KEY_COUNT]>,
}

impl KeyInput {
    pub fn new(keypad: Arc<Keypad>) -> Self {
        Self {
            keypad,
            presses: Arc::default(),
        }
    }

    /// Apply the command to the keypad. Taps release the key from a
    /// short lived thread so the caller never blocks.
    pub fn apply(&self, command: KeyCommand) {
        match command {
            KeyCommand::Press(code) => {
                self.press(code);
            }
            KeyCommand::Release(code) => self.keypad.set(code, false),
            KeyCommand::Tap(code) => {
                let Some(press) = self.press(code) else {
                    return;
                };
                let input = self.clone();
                thread::spawn(move || {
                    thread::sleep(TAP_DURATION);
                    if input.press_count(code) == Some(press) {
                        input.keypad.set(code, false);
                    }
                });
            }
        }
    }

    /// Hold `code` down and return its new press count, `None` if there
    /// is no such key.
    fn press(&self, code: u8) -> Option<u32> {
        self.keypad.set(code, true);
        let count = self.presses.get(usize::from(code))?;
        Some(count.fetch_add(1, Ordering::SeqCst).wrapping_add(1))
    }

    fn press_count(&self, code: u8) -> Option<u32> {
        let count = self.presses.get(usize::from(code))?;
        Some(count.load(Ordering::SeqCst))
    }

    /// Apply every key command found in `line`, ignoring unknown words.
    pub fn handle_line(&self, line: &str) {
        for word in line.split_whitespace() {
            match KeyCommand::parse(word) {
                Some(command) => {
                    log::debug!("Key command {command:?}");
                    self.apply(command);
                }
                None => log::debug!("Ignoring unknown key {word:?}"),
            }
        }
    }
}

/// Read key commands from stdin on a background thread until stdin closes.
pub fn spawn_stdin_reader(input: KeyInput) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin key reader".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => input.handle_line(&line),
                    Err(e) => {
                        log::error!("Failed to read from stdin: {e}");
                        break;
                    }
                }
            }
            log::debug!("Stdin closed, no more key input");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(KeyCommand::parse("+q"), Some(KeyCommand::Press(0x4)));
        assert_eq!(KeyCommand::parse("-q"), Some(KeyCommand::Release(0x4)));
        assert_eq!(KeyCommand::parse("w"), Some(KeyCommand::Tap(0x5)));
        assert_eq!(KeyCommand::parse("+nope"), None);
        assert_eq!(KeyCommand::parse("+"), None);
    }

    #[test]
    fn test_handle_line_press_and_release() {
        let keypad = Arc::new(Keypad::new());
        let input = KeyInput::new(Arc::clone(&keypad));
        input.handle_line("+e +r bogus");
        assert!(keypad.is_pressed(0x6));
        assert!(keypad.is_pressed(0xD));
        input.handle_line("-e");
        assert!(!keypad.is_pressed(0x6));
        assert!(keypad.is_pressed(0xD));
    }

    #[test]
    fn test_tap_releases_later() {
        let keypad = Arc::new(Keypad::new());
        let input = KeyInput::new(Arc::clone(&keypad));
        input.apply(KeyCommand::Tap(0x1));
        assert!(keypad.is_pressed(0x1));
        thread::sleep(TAP_DURATION * 4);
        assert!(!keypad.is_pressed(0x1));
    }

    #[test]
    fn test_tap_release_spares_key_pressed_again() {
        let keypad = Arc::new(Keypad::new());
        let input = KeyInput::new(Arc::clone(&keypad));
        input.apply(KeyCommand::Tap(0x2));
        input.apply(KeyCommand::Press(0x2));
        thread::sleep(TAP_DURATION * 4);
        assert!(keypad.is_pressed(0x2));

        input.apply(KeyCommand::Release(0x2));
        assert!(!keypad.is_pressed(0x2));
    }

    #[test]
    fn test_out_of_range_codes_are_ignored() {
        let keypad = Arc::new(Keypad::new());
        let input = KeyInput::new(Arc::clone(&keypad));
        input.apply(KeyCommand::Tap(0x10));
        input.apply(KeyCommand::Press(0x42));
        assert_eq!(keypad.first_pressed(), None);
    }
}
