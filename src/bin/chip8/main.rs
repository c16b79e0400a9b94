// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! chip8: runs a Chip-8 ROM in a window

mod error;
mod ui;

use chip8vm::*;
use error::{Error, Result};
use gumdrop::*;
use log::{info, warn};
use owo_colors::OwoColorize;
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use ui::*;

pub fn main() {
    env_logger::init();
    let options = Arguments::parse_args_default_or_exit();
    let state = match State::new(options) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e.bold().red());
            std::process::exit(1);
        }
    };
    for result in state {
        if let Err(e) = result {
            eprintln!("{}", e.bold().red());
            break;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Load a ROM to run.", required, free)]
    pub file: PathBuf,
    #[options(help = "Print this help message.")]
    help: bool,
    #[options(help = "Enable debug mode at startup.")]
    pub debug: bool,
    #[options(help = "Enable pause mode at startup.")]
    pub pause: bool,
    #[options(
        help = "Refuse stack overflows and out-of-range keys instead of wrapping them."
    )]
    pub strict: bool,

    #[options(help = "Set the instructions-per-frame rate.", default = "10")]
    pub speed: usize,
    #[options(
        short = "t",
        help = "Set the instructions-per-timer-tick ratio.",
        default = "1",
        meta = "N"
    )]
    pub timer_ratio: usize,
    #[options(help = "Set the target framerate.", default = "60", meta = "FR")]
    pub frame_rate: u64,
}

#[derive(Debug)]
struct State {
    pub speed: usize,
    pub rate: u64,
    pub cpu: CPU,
    pub ui: UI,
    pub ft: Instant,
}

impl State {
    fn new(options: Arguments) -> Result<Self> {
        let rom = std::fs::read(&options.file).map_err(|source| Error::Io {
            path: options.file.clone(),
            source,
        })?;
        let mut cpu = CPU::new(Flags {
            debug: options.debug,
            pause: options.pause,
            strict: options.strict,
            timer_ratio: options.timer_ratio,
        });
        cpu.load_program(&rom)?;
        info!("Loaded {} bytes from {}", rom.len(), options.file.display());
        Ok(State {
            speed: options.speed,
            rate: options.frame_rate.max(1),
            cpu,
            ui: UIBuilder::new(WIDTH, HEIGHT, &options.file).build()?,
            ft: Instant::now(),
        })
    }
    fn keys(&mut self) -> Result<bool> {
        self.ui.keys(&mut self.cpu)
    }
    fn frame(&mut self) -> Result<bool> {
        self.ui.frame(&self.cpu)
    }
    /// Runs one frame's worth of instructions.
    /// Returns false if the interpreter was asked to quit.
    fn tick_cpu(&mut self) -> bool {
        if self.cpu.flags.pause {
            return true;
        }
        let cycle = self.cpu.multistep(&mut self.ui, self.speed);
        report(&cycle, self.cpu.pc())
    }
    fn wait_for_next_frame(&mut self) {
        let rate = Duration::from_nanos(1_000_000_000 / self.rate + 1);
        std::thread::sleep(rate.saturating_sub(self.ft.elapsed()));
        self.ft += rate;
    }
}

/// Logs what happened during a frame, beep first.
/// Returns false if the interpreter was asked to quit.
fn report(cycle: &Cycle, pc: u16) -> bool {
    if cycle.beep {
        info!("beep");
    }
    if let Some(fault) = cycle.fault {
        warn!("{pc:03x}: {fault}");
    }
    !cycle.quit
}

impl Iterator for State {
    type Item = Result<()>;

    fn next(&mut self) -> Option<Self::Item> {
        self.wait_for_next_frame();
        match self.keys() {
            Ok(opt) if !opt => return None,
            Err(e) => return Some(Err(e)),
            _ => (),
        }
        if !self.tick_cpu() {
            return None;
        }
        match self.frame() {
            Ok(opt) if !opt => return None,
            Err(e) => return Some(Err(e)),
            _ => (),
        }
        Some(Ok(()))
    }
}
