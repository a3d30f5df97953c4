use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Interval between two timer decrements in [`TimerMode::RealTime`].
const TIMER_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Decides what drives the decay of the delay and sound timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// Both timers count down once for every executed instruction.
    #[default]
    PerStep,
    /// Both timers count down at 60Hz of wall-clock time, checked on every step.
    RealTime,
    /// Stepping never touches the timers, the host calls [`Clock::tick`] itself.
    External,
}

/// Handles the updating of the `Chip8` sound and delay timers.
///
/// The sound timer is shared so that an audio collaborator can watch it
/// from its own thread.
pub struct Clock {
    pub delay_timer: u8,
    pub sound_timer: Arc<AtomicU8>,
    pub mode: TimerMode,
    beep: bool,
    last_tick: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            delay_timer: Default::default(),
            sound_timer: Default::default(),
            mode: Default::default(),
            beep: false,
            last_tick: Instant::now(),
        }
    }
}

impl Clock {
    /// Create a new [`Clock`] with both timers at zero.
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Called by the processor after every executed instruction.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Same as [`Clock::update`], with `now` as the current time.
    fn update_at(&mut self, now: Instant) {
        match self.mode {
            TimerMode::PerStep => self.tick(),
            TimerMode::RealTime => {
                if now.saturating_duration_since(self.last_tick) >= TIMER_PERIOD {
                    self.tick();
                    self.last_tick = now;
                }
            }
            TimerMode::External => {}
        }
    }

    /// Decrement both timers by one, stopping at zero.
    ///
    /// The sound timer reaching zero raises a beep, see [`Clock::take_beep`].
    pub fn tick(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);

        let sound = self.sound_timer.load(Ordering::SeqCst);
        if sound > 0 {
            self.sound_timer.store(sound - 1, Ordering::SeqCst);
            if sound == 1 {
                log::debug!("Sound timer expired");
                self.beep = true;
            }
        }
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.load(Ordering::SeqCst)
    }

    pub fn set_sound_timer(&self, value: u8) {
        self.sound_timer.store(value, Ordering::SeqCst);
    }

    /// Returns whether the sound timer ran out since the last call,
    /// clearing the pending beep.
    pub fn take_beep(&mut self) -> bool {
        std::mem::take(&mut self.beep)
    }

    /// Zero both timers and drop any pending beep. The mode and the
    /// shared sound timer handle are kept.
    pub fn reset(&mut self) {
        self.delay_timer = 0;
        self.set_sound_timer(0);
        self.beep = false;
        self.last_tick = Instant::now();
    }
}
