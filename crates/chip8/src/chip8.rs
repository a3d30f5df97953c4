use std::sync::{atomic::AtomicU8, Arc};

use crate::processor::Processor;

mod clock;
pub mod graphics;
mod input;
mod memory;
mod processor;

pub use clock::TimerMode;
pub use input::{Keypad, KEY_COUNT};
pub use memory::{LoadError, FONT, MAX_PROGRAM_SIZE};
pub use processor::{ProcessorError, Quirks, STARTING_PC};

/// Contains all the different components of the `Chip8` system, excluding the `Processor`.
#[derive(Default)]
pub struct Bus {
    pub clock: clock::Clock,
    pub graphics: graphics::FrameBuffer,
    pub keypad: Arc<Keypad>,
    pub memory: memory::Memory,
}

/// Settings fixed when a [`Chip8`] is created. They survive [`Chip8::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub quirks: Quirks,
    pub timer_mode: TimerMode,
}

/// The main CHIP-8 interpreter state, contains all the components of the
/// CHIP-8 and procedures to interact with them at a high level.
#[derive(Default)]
pub struct Chip8 {
    pub processor: Processor,
    pub bus: Bus,
    loaded: bool,
}

impl Chip8 {
    /// Create a new Chip8 instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Chip8 instance with the given quirks and timer mode.
    pub fn with_config(config: Config) -> Self {
        Self {
            processor: Processor::with_quirks(config.quirks),
            bus: Bus {
                clock: clock::Clock::new(config.timer_mode),
                ..Default::default()
            },
            loaded: false,
        }
    }

    /// Load the given program into memory at `0x200`.
    ///
    /// Only one program can be resident at a time, [`Chip8::reset`] first
    /// to replace it. On error the machine stays unloaded.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if self.loaded {
            return Err(LoadError::AlreadyLoaded);
        }
        self.bus.memory.load_program(program)?;
        self.loaded = true;
        log::info!("Loaded a {} byte program", program.len());
        Ok(())
    }

    /// Performs one execution step in the interpreter, running a single
    /// instruction and updating the timers accordingly.
    pub fn step(&mut self) -> Result<(), ProcessorError> {
        if !self.loaded {
            return Err(ProcessorError::NoProgram);
        }
        self.processor.cycle(&mut self.bus)?;
        self.bus.clock.update();
        Ok(())
    }

    /// Whether a program is loaded and the processor has not halted.
    pub fn is_running(&self) -> bool {
        self.loaded && self.processor.is_running()
    }

    /// The current pixels, row-major, each `0` or `1`.
    pub fn framebuffer(&self) -> &[u8; graphics::PIXEL_COUNT] {
        self.bus.graphics.pixels()
    }

    /// Whether the framebuffer changed since the last [`Chip8::clear_redraw`].
    pub fn needs_redraw(&self) -> bool {
        self.bus.graphics.needs_redraw()
    }

    /// Acknowledge a repaint of the framebuffer.
    pub fn clear_redraw(&mut self) {
        self.bus.graphics.clear_redraw();
    }

    /// Update the input state for the given key code.
    pub fn set_key(&self, key_code: u8, pressed: bool) {
        self.bus.keypad.set(key_code, pressed);
    }

    /// A handle to the keypad that can be moved to an input thread.
    pub fn keypad(&self) -> Arc<Keypad> {
        Arc::clone(&self.bus.keypad)
    }

    /// A handle to the sound timer, for collaborators that play audio.
    pub fn sound_timer(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.bus.clock.sound_timer)
    }

    /// Returns whether the sound timer expired since the last call.
    pub fn take_beep(&mut self) -> bool {
        self.bus.clock.take_beep()
    }

    /// Count both timers down once. Meant for [`TimerMode::External`], where
    /// stepping leaves the timers alone.
    pub fn tick_timers(&mut self) {
        self.bus.clock.tick();
    }

    /// Reset the state of the `Chip8` instance, unloading the program.
    /// Key states, quirks and the timer mode are kept.
    pub fn reset(&mut self) {
        self.processor.reset(&mut self.bus);
        self.loaded = false;
    }

    /// Convenience method for resetting the `Chip8` and loading the given program.
    pub fn reset_and_load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.reset();
        self.load(program)
    }
}
