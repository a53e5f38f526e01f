//! Drives an [`Emulator`] in time.
//!
//! Two independent streams: timer ticks at `Speed::timer_rate` and batches of
//! `Speed::batch_size` instructions at `Speed::batch_rate`. Both run on the
//! caller's thread, so a timer tick never lands in the middle of an instruction.

use std::io;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::emulator::config::Speed;
use crate::emulator::emulator::Emulator;
use crate::emulator::fault::Fault;
use crate::emulator::input::EmulatorInput;
use crate::emulator::output::EmulatorOutput;
use crate::emulator::rom::RomSource;

/// What an external controller can ask of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    TogglePause,
    Reset,
    Step,
    Quit,
}

pub struct Scheduler<I: EmulatorInput, O: EmulatorOutput, R: RomSource> {
    emulator: Emulator<I>,
    output: O,
    rom: R,
    speed: Speed,

    // Set once a program has been copied in, cleared on reset
    loaded: bool,
    running: bool,
    paused: bool,
    quit: bool,

    // Time since the last timer tick and the last batch
    timer_elapsed: Duration,
    batch_elapsed: Duration,

    shown_status: Option<(bool, Option<Fault>)>,
}

impl<I: EmulatorInput, O: EmulatorOutput, R: RomSource> Scheduler<I, O, R> {
    /// Nothing runs until [`Scheduler::reset`] has loaded the program.
    pub fn new(emulator: Emulator<I>, output: O, rom: R, speed: Speed) -> Self {
        Scheduler {
            emulator,
            output,
            rom,
            speed,
            loaded: false,
            running: false,
            paused: false,
            quit: false,
            timer_elapsed: Duration::from_secs(0),
            batch_elapsed: Duration::from_secs(0),
            shown_status: None,
        }
    }

    pub fn emulator(&self) -> &Emulator<I> {
        &self.emulator
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Begin ticking. Refused until a program has been loaded.
    pub fn start(&mut self) {
        if !self.loaded {
            log::warn!("No program loaded, not starting");
            return;
        }
        if !self.running {
            log::info!("Emulation started");
            self.running = true;
        }
        self.present();
    }

    /// Pause if running freely, resume if paused. Returns whether it is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        log::info!("Emulation {}", if self.paused { "paused" } else { "resumed" });
        self.present();
        self.paused
    }

    /// Reset the emulator, fetch the program again and start running it.
    /// Nothing runs if the program can't be fetched or doesn't fit.
    pub fn reset(&mut self) -> io::Result<()> {
        self.loaded = false;
        self.running = false;
        self.paused = false;
        self.timer_elapsed = Duration::from_secs(0);
        self.batch_elapsed = Duration::from_secs(0);
        self.emulator.reset();
        self.present();

        let program = self.rom.fetch()?;
        if self.emulator.load(&program).is_ok() {
            self.loaded = true;
            self.start();
        } else {
            self.present();
        }
        Ok(())
    }

    /// Replace the program and reset.
    pub fn change_rom(&mut self, rom: R) -> io::Result<()> {
        self.rom = rom;
        self.reset()
    }

    /// Execute exactly one instruction, whether paused or not.
    /// Does nothing until a program has been loaded.
    pub fn step(&mut self) {
        if !self.loaded {
            log::warn!("No program loaded, not stepping");
            return;
        }
        // Faults are logged and shown on the status line
        let _ = self.emulator.step();
        self.present();
    }

    /// Let `elapsed` time pass, firing timer ticks and instruction batches
    /// in the order they fall due. Nothing happens before start or while paused.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.running || self.paused {
            return;
        }

        let timer_period = self.speed.timer_period();
        let batch_period = self.speed.batch_period();
        let mut remaining = elapsed;
        loop {
            let until_timer = timer_period - self.timer_elapsed;
            let until_batch = batch_period - self.batch_elapsed;
            let next = until_timer.min(until_batch);
            if next > remaining {
                self.timer_elapsed += remaining;
                self.batch_elapsed += remaining;
                break;
            }

            remaining -= next;
            self.timer_elapsed += next;
            self.batch_elapsed += next;

            if self.timer_elapsed >= timer_period {
                self.timer_elapsed -= timer_period;
                self.emulator.tick_timers();
            }
            if self.batch_elapsed >= batch_period {
                self.batch_elapsed -= batch_period;
                self.emulator.run_batch(self.speed.batch_size);
                self.present();
            }
        }
    }

    pub fn apply(&mut self, command: Command) -> io::Result<()> {
        log::debug!("Got command {:?}", command);
        match command {
            Command::Start => self.start(),
            Command::TogglePause => {
                self.toggle_pause();
            }
            Command::Reset => self.reset()?,
            Command::Step => self.step(),
            Command::Quit => self.quit = true,
        }
        Ok(())
    }

    /// Run in real time until `Command::Quit` arrives or every sender is gone.
    pub fn run(&mut self, commands: &Receiver<Command>) {
        let poll_interval = self.speed.timer_period().min(self.speed.batch_period()) / 4;
        let mut last = Instant::now();
        while !self.quit {
            loop {
                match commands.try_recv() {
                    Ok(command) => {
                        if let Err(e) = self.apply(command) {
                            log::error!("Could not {:?}: {}", command, e);
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        log::info!("Controller is gone, stopping");
                        self.quit = true;
                        break;
                    }
                }
            }

            let now = Instant::now();
            self.advance(now - last);
            last = now;
            thread::sleep(poll_interval);
        }
        log::info!("Emulation stopped");
    }

    /// Hand the framebuffer to the output if it changed, and the status if that changed.
    fn present(&mut self) {
        if self.emulator.take_redraw() {
            self.output.refresh(self.emulator.framebuffer());
        }
        let status = (self.paused, self.emulator.last_fault());
        if self.shown_status != Some(status) {
            self.output.status(status.0, status.1);
            self.shown_status = Some(status);
        }
    }
}
