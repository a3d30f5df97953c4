mod app;
mod input;
mod keymap;
mod renderer;

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use chip8::{Chip8, Config, Quirks, TimerMode};
use clap::{Parser, ValueEnum};

use crate::app::{App, Settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimerModeArg {
    PerStep,
    RealTime,
    External,
}

impl From<TimerModeArg> for TimerMode {
    fn from(arg: TimerModeArg) -> Self {
        match arg {
            TimerModeArg::PerStep => TimerMode::PerStep,
            TimerModeArg::RealTime => TimerMode::RealTime,
            TimerModeArg::External => TimerMode::External,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(version, about = "Runs CHIP-8 programs in the terminal")]
struct CliOpts {
    /// The path to the file containing the ROM.
    /// The file's contents will be loaded into the interpreter's memory,
    /// starting at address 0x200.
    rom_file: PathBuf,
    /// Milliseconds between two batches of steps.
    #[clap(long, default_value_t = 16)]
    tick_ms: u64,
    /// Instructions executed per tick.
    #[clap(long, default_value_t = app::DEFAULT_STEPS_PER_TICK)]
    steps_per_tick: u32,
    /// What drives the delay and sound timers.
    #[clap(long, value_enum, default_value = "per-step")]
    timer_mode: TimerModeArg,
    /// Store 1 in VF after a left shift that overflows, instead of the raw bit.
    #[clap(long)]
    normalize_shift_flag: bool,
    /// Leave I untouched by Fx55 and Fx65.
    #[clap(long)]
    no_index_increment: bool,
    /// Exit after this many ticks.
    #[clap(long)]
    max_ticks: Option<u64>,
    /// Append frames instead of redrawing them in place.
    #[clap(long)]
    no_ansi: bool,
    /// Log more, repeat for even more.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,
}

/// Send log records to stderr, so they do not mix with the frames on stdout.
fn setup_logging(verbosity: u64) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("Failed to set up logging")
}

fn main() -> anyhow::Result<()> {
    let cli_opts = CliOpts::parse();
    setup_logging(cli_opts.verbose)?;

    let timer_mode = TimerMode::from(cli_opts.timer_mode);
    let mut chip8 = Chip8::with_config(Config {
        quirks: Quirks {
            normalize_shift_flag: cli_opts.normalize_shift_flag,
            increment_index_on_transfer: !cli_opts.no_index_increment,
        },
        timer_mode,
    });

    let rom = App::read_rom(&cli_opts.rom_file)?;
    chip8
        .load(&rom)
        .with_context(|| format!("Failed to load {}", cli_opts.rom_file.display()))?;

    // the reader thread ends on its own once stdin closes
    input::spawn_stdin_reader(input::KeyInput::new(chip8.keypad()))
        .context("Failed to start the input thread")?;

    let mut app = App::new(
        chip8,
        Settings {
            tick: Duration::from_millis(cli_opts.tick_ms),
            steps_per_tick: cli_opts.steps_per_tick,
            timer_mode,
            max_ticks: cli_opts.max_ticks,
            ansi: !cli_opts.no_ansi,
        },
    );
    app.run(&mut std::io::stdout().lock())
}
