use std::{
    io::Write,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use chip8::{Chip8, TimerMode};

use crate::renderer::Renderer;

pub const DEFAULT_STEPS_PER_TICK: u32 = 10;
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

/// The terminal bell, written whenever the sound timer runs out.
const BELL: &[u8] = b"\x07";

/// How the host drives the interpreter.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub tick: Duration,
    pub steps_per_tick: u32,
    pub timer_mode: TimerMode,
    /// Stop after this many ticks, run until an error otherwise.
    pub max_ticks: Option<u64>,
    pub ansi: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            steps_per_tick: DEFAULT_STEPS_PER_TICK,
            timer_mode: TimerMode::default(),
            max_ticks: None,
            ansi: true,
        }
    }
}

/// The main application state.
///
/// Handles interactions between the terminal and the backend [`Chip8`].
pub struct App {
    pub chip8: Chip8,
    renderer: Renderer,
    settings: Settings,
}

impl App {
    /// Create a new `App` around an already loaded `Chip8`.
    pub fn new(chip8: Chip8, settings: Settings) -> Self {
        Self {
            chip8,
            renderer: Renderer::new(settings.ansi),
            settings,
        }
    }

    /// Read the ROM data from `path`.
    pub fn read_rom(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
        let path = path.as_ref();
        std::fs::read(path).with_context(|| format!("Failed to read ROM from {}", path.display()))
    }

    /// Run ticks until the interpreter fails or `max_ticks` is reached,
    /// drawing frames to `out`.
    pub fn run(&mut self, out: &mut impl Write) -> anyhow::Result<()> {
        let mut ticks = 0;
        while self.settings.max_ticks.map_or(true, |max| ticks < max) {
            let started = Instant::now();
            self.tick(out)?;
            ticks += 1;

            if let Some(rest) = self.settings.tick.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        log::info!("Stopped after {ticks} ticks");
        Ok(())
    }

    /// Run one batch of steps, then present whatever changed.
    fn tick(&mut self, out: &mut impl Write) -> anyhow::Result<()> {
        for _ in 0..self.settings.steps_per_tick {
            if let Err(e) = self.chip8.step() {
                let processor = &self.chip8.processor;
                log::error!(
                    "Interpreter stopped at {:#06X} (opcode {:#06X}): {e}",
                    processor.last_opcode_addr,
                    processor.last_opcode
                );
                return Err(e).context("Failed to execute the program");
            }
        }

        if self.settings.timer_mode == TimerMode::External {
            self.chip8.tick_timers();
        }

        if self.chip8.needs_redraw() {
            self.renderer
                .draw(self.chip8.framebuffer(), out)
                .context("Failed to draw frame")?;
            self.chip8.clear_redraw();
        }

        if self.chip8.take_beep() {
            log::info!("Beep");
            out.write_all(BELL)?;
            out.flush()?;
        }
        Ok(())
    }
}
