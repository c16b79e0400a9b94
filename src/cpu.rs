// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Decodes and runs instructions


pub mod behavior;
pub mod flags;
pub mod instruction;

use self::{
    flags::Flags,
    instruction::{
        disassembler::{Dis, Disassembler},
        Instruction,
    },
};
use crate::{
    error::{Error, Result},
    io::{KeyInput, QuitSignal},
    screen::Screen,
};
use log::{debug, trace};
use owo_colors::OwoColorize;
use std::{fmt::Debug, ops::Range};

type Reg = usize;
type Adr = u16;
type Nib = u8;

/// Size of the address space, in bytes
pub const MEMORY_SIZE: usize = 0x1000;
/// Where programs are loaded, and where execution starts
pub const PROGRAM_START: Adr = 0x200;
/// Depth of the call stack
pub const STACK_DEPTH: usize = 16;
/// Bytes per font glyph
pub const GLYPH_SIZE: usize = 5;

/// The built-in hex font, one 5-byte glyph per digit `0..=F`, loaded at address 0
#[rustfmt::skip]
pub const FONT: [u8; 16 * GLYPH_SIZE] = [
    0xf0, 0x90, 0x90, 0x90, 0xf0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xf0, 0x10, 0xf0, 0x80, 0xf0, // 2
    0xf0, 0x10, 0xf0, 0x10, 0xf0, // 3
    0x90, 0x90, 0xf0, 0x10, 0x10, // 4
    0xf0, 0x80, 0xf0, 0x10, 0xf0, // 5
    0xf0, 0x80, 0xf0, 0x90, 0xf0, // 6
    0xf0, 0x10, 0x20, 0x40, 0x40, // 7
    0xf0, 0x90, 0xf0, 0x90, 0xf0, // 8
    0xf0, 0x90, 0xf0, 0x10, 0xf0, // 9
    0xf0, 0x90, 0xf0, 0x90, 0x90, // A
    0xe0, 0x90, 0xe0, 0x90, 0xe0, // B
    0xf0, 0x80, 0x80, 0x80, 0xf0, // C
    0xe0, 0x90, 0x90, 0x90, 0xe0, // D
    0xf0, 0x80, 0xf0, 0x80, 0xf0, // E
    0xf0, 0x80, 0xf0, 0x80, 0x80, // F
];

/// What happened during one [CPU::step]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cycle {
    /// The framebuffer changed, and should be presented
    pub redraw: bool,
    /// The sound timer just ran out
    pub beep: bool,
    /// The host asked the interpreter to stop
    pub quit: bool,
    /// The instruction failed. The timers still ticked.
    pub fault: Option<Error>,
}

impl Cycle {
    /// Turns a faulted cycle into an [Err], for `?`-style callers.
    ///
    /// Anything else the cycle reported is lost along with it, so hosts that
    /// care about `beep` or `redraw` should read them before calling this.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let fault = Cycle {
    ///     beep: true,
    ///     fault: Some(Error::InvalidOpcode { word: 0xffff }),
    ///     ..Default::default()
    /// };
    /// assert_eq!(Err(Error::InvalidOpcode { word: 0xffff }), fault.check());
    /// assert_eq!(Ok(Cycle::default()), Cycle::default().check());
    /// ```
    pub fn check(self) -> Result<Self> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self),
        }
    }

    /// Merges the outcome of a later cycle into this one
    fn merge(&mut self, later: Cycle) {
        self.redraw |= later.redraw;
        self.beep |= later.beep;
        self.quit |= later.quit;
        self.fault = self.fault.or(later.fault);
    }
}

/// Represents the internal state of the CPU interpreter
#[derive(Clone, PartialEq)]
pub struct CPU {
    /// Flags that control how the CPU behaves, but which aren't inherent to the
    /// chip-8. Includes debug mode, strict mode, and the timer ratio.
    pub flags: Flags,
    // memory
    memory: [u8; MEMORY_SIZE],
    stack: [Adr; STACK_DEPTH],
    sp: usize,
    // registers
    pc: Adr,
    i: Adr,
    v: [u8; 16],
    delay: u8,
    sound: u8,
    // I/O
    keys: [bool; 16],
    screen: Screen,
    quit: QuitSignal,
    // Execution data
    cycle: usize,
    disassembler: Dis,
}

// public interface
impl CPU {
    /// Constructs a new, initialized CPU with the provided [Flags]
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let cpu = CPU::new(Flags {
    ///     strict: true,
    ///     ..Default::default()
    /// });
    /// assert_eq!(0x200, cpu.pc());
    /// assert!(cpu.flags.strict);
    /// ```
    pub fn new(flags: Flags) -> Self {
        CPU {
            flags,
            ..Default::default()
        }
    }

    /// Resets the whole machine: zeroes memory and registers, reloads the font,
    /// and points the program counter at `0x200`.
    ///
    /// Does not touch the [Flags] or the quit signal.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_program(&[0x12, 0x00]).unwrap();
    /// cpu.initialize();
    /// assert_eq!(0, cpu.read(0x200).unwrap());
    /// assert_eq!(0xf0, cpu.read(0).unwrap());
    /// ```
    pub fn initialize(&mut self) -> &mut Self {
        self.memory = [0; MEMORY_SIZE];
        self.memory[..FONT.len()].copy_from_slice(&FONT);
        self.reset();
        self
    }

    /// Resets the emulator, but keeps memory (and the program in it).
    ///
    /// Touches the stack, pc, registers, timers, keys, screen, and cycle count.
    ///
    /// Does not touch [Flags], memory, or the quit signal.
    pub fn reset(&mut self) {
        // clear the stack
        self.stack = [0; STACK_DEPTH];
        self.sp = 0;
        // Reset the program counter
        self.pc = PROGRAM_START;
        // Zero the registers
        self.i = 0;
        self.v = [0; 16];
        self.delay = 0;
        self.sound = 0;
        // I/O
        self.keys = [false; 16];
        self.screen.clear();
        // Execution data
        self.cycle = 0;
    }

    /// Loads bytes into the CPU's program space, at `0x200`.
    ///
    /// Returns [Error::ProgramTooLarge] if the program would run off the end of
    /// memory, and leaves memory untouched.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_program(&[0x00, 0xe0]).unwrap();
    /// assert_eq!(0xe0, cpu.read(0x201).unwrap());
    /// cpu.load_program(&[0; 0xe01])
    ///     .expect_err("0xe01 bytes can't fit above 0x200");
    /// ```
    pub fn load_program(&mut self, rom: &[u8]) -> Result<&mut Self> {
        let start = PROGRAM_START as usize;
        let max = MEMORY_SIZE - start;
        if rom.len() > max {
            return Err(Error::ProgramTooLarge {
                len: rom.len(),
                max,
            });
        }
        self.memory[start..].fill(0);
        self.memory[start..start + rom.len()].copy_from_slice(rom);
        Ok(self)
    }

    /// Reads a byte of memory.
    /// Returns [Error::OutOfBounds] past the end of memory.
    pub fn read(&self, addr: usize) -> Result<u8> {
        self.memory
            .get(addr)
            .copied()
            .ok_or(Error::OutOfBounds { addr })
    }

    /// Writes a byte of memory.
    /// Returns [Error::OutOfBounds] past the end of memory.
    pub fn write(&mut self, addr: usize, value: u8) -> Result<()> {
        let byte = self
            .memory
            .get_mut(addr)
            .ok_or(Error::OutOfBounds { addr })?;
        *byte = value;
        Ok(())
    }

    /// Gets a slice of the entire memory
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Sets the state of a key, and reports whether the key's state changed.
    /// If key does not exist, returns [Error::InvalidKey].
    ///
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// assert!(cpu.set_key(0x7, true).unwrap());
    /// // already down, so nothing's changed.
    /// assert!(!cpu.set_key(0x7, true).unwrap());
    /// cpu.set_key(0x10, true).expect_err("There are only 16 keys");
    /// ```
    pub fn set_key(&mut self, key: usize, pressed: bool) -> Result<bool> {
        let keyref = self.keys.get_mut(key).ok_or(Error::InvalidKey { key })?;
        let changed = *keyref != pressed;
        *keyref = pressed;
        Ok(changed)
    }

    /// Presses a key, and reports whether the key's state changed.
    /// If key does not exist, returns [Error::InvalidKey].
    pub fn press(&mut self, key: usize) -> Result<bool> {
        self.set_key(key, true)
    }

    /// Releases a key, and reports whether the key's state changed.
    /// If key is outside range `0..=0xF`, returns [Error::InvalidKey].
    pub fn release(&mut self, key: usize) -> Result<bool> {
        self.set_key(key, false)
    }

    /// Gets the pressed state of every key
    pub fn keys(&self) -> &[bool] {
        &self.keys
    }

    /// Sets a general purpose register in the CPU.
    /// If the register doesn't exist, returns [Error::InvalidRegister]
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.set_v(0x4, 0x41).unwrap();
    /// assert_eq!(0x41, cpu.v()[4]);
    /// cpu.set_v(0x10, 0).expect_err("There is no v10");
    /// ```
    pub fn set_v(&mut self, reg: Reg, value: u8) -> Result<()> {
        if let Some(gpr) = self.v.get_mut(reg) {
            *gpr = value;
            Ok(())
        } else {
            Err(Error::InvalidRegister { reg })
        }
    }

    /// Gets a slice of the entire general purpose registers
    pub fn v(&self) -> &[u8] {
        self.v.as_slice()
    }

    /// Gets the program counter
    pub fn pc(&self) -> Adr {
        self.pc
    }

    /// Gets the I register
    pub fn i(&self) -> Adr {
        self.i
    }

    /// Gets the stack pointer (the number of return addresses on the stack)
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Gets the live part of the call stack, oldest first
    pub fn stack(&self) -> &[Adr] {
        &self.stack[..self.sp.min(STACK_DEPTH)]
    }

    /// Gets the value in the Sound Timer register
    pub fn sound(&self) -> u8 {
        self.sound
    }

    /// Gets the value in the Delay Timer register
    pub fn delay(&self) -> u8 {
        self.delay
    }

    /// Gets the number of cycles the CPU has executed
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Gets the framebuffer, for presentation
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Asks the interpreter to stop.
    ///
    /// Ends any pending key-wait, and makes every following [Cycle] report `quit`.
    pub fn request_quit(&self) {
        self.quit.set()
    }

    /// Gets a handle to the quit signal, which can be raised from another thread
    pub fn quit_signal(&self) -> QuitSignal {
        self.quit.clone()
    }

    /// Unpauses the emulator for a single step,
    /// even if cpu.flags.pause is set.
    pub fn singlestep(&mut self, input: &mut impl KeyInput) -> Cycle {
        let pause = std::mem::replace(&mut self.flags.pause, false);
        let cycle = self.step(input);
        self.flags.pause = pause;
        cycle
    }

    /// Runs up to `steps` cycles, stopping early on a fault or a quit request.
    ///
    /// The returned [Cycle] reports whether *any* of the cycles redrew or beeped,
    /// including the cycle that faulted, and carries the first fault.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_program(&[
    ///     0x00, 0xe0, // cls
    ///     0x12, 0x02, // jump 0x202 (pc)
    /// ]).unwrap();
    /// let cycle = cpu.multistep(&mut NoInput, 0x20)
    ///     .check()
    ///     .expect("The program should only have valid opcodes.");
    /// assert!(cycle.redraw);
    /// assert_eq!(0x202, cpu.pc());
    /// assert_eq!(0x20, cpu.cycle());
    /// ```
    pub fn multistep(&mut self, input: &mut impl KeyInput, steps: usize) -> Cycle {
        let mut total = Cycle::default();
        for _ in 0..steps {
            total.merge(self.step(input));
            if total.fault.is_some() || total.quit {
                break;
            }
        }
        total
    }

    /// Executes a single cycle, turning a fault into an [Err].
    ///
    /// The timers tick whether or not the instruction faulted.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_program(&[0xff, 0xff]).unwrap();
    /// assert_eq!(
    ///     Err(Error::InvalidOpcode { word: 0xffff }),
    ///     cpu.tick(&mut NoInput)
    /// );
    /// assert_eq!(0x200, cpu.pc());
    /// ```
    pub fn tick(&mut self, input: &mut impl KeyInput) -> Result<Cycle> {
        self.step(input).check()
    }

    /// Executes a single cycle: fetch, decode, execute, then tick the timers.
    ///
    /// `input` is only consulted by the key-wait instruction, which blocks on it
    /// until a key goes down or a quit is requested.
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_program(&[
    ///     0x00, 0xe0, // cls
    ///     0x12, 0x02, // jump 0x202 (pc)
    /// ]).unwrap();
    /// let cycle = cpu.step(&mut NoInput);
    /// assert!(cycle.redraw);
    /// assert_eq!(None, cycle.fault);
    /// assert_eq!(0x202, cpu.pc());
    /// assert_eq!(1, cpu.cycle());
    /// ```
    pub fn step(&mut self, input: &mut impl KeyInput) -> Cycle {
        let mut cycle = Cycle::default();
        // Do nothing if paused
        if self.flags.pause {
            cycle.quit = self.quit.is_set();
            return cycle;
        }
        self.cycle += 1;

        match self.fetch() {
            Ok(insn) => {
                // Print opcode disassembly:
                if self.flags.debug {
                    debug!(
                        "{:3} {:03x}: {:<36}",
                        self.cycle.bright_black(),
                        self.pc,
                        self.disassembler.once(insn.word)
                    );
                }
                match self.execute(insn, input) {
                    Ok(effect) => effect.apply(&mut cycle),
                    Err(fault) => cycle.fault = Some(fault),
                }
            }
            Err(fault) => cycle.fault = Some(fault),
        }

        if self.cycle % self.flags.timer_ratio.max(1) == 0 {
            cycle.beep = self.tick_timers();
        }
        cycle.quit |= self.quit.is_set();
        cycle
    }

    /// Dumps the current state of all CPU registers, and the cycle count
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.dump();
    /// ```
    /// outputs
    /// ```text
    /// PC: 0200, SP: 0000, I: 0000
    /// v0: 00 v1: 00 v2: 00 v3: 00
    /// v4: 00 v5: 00 v6: 00 v7: 00
    /// v8: 00 v9: 00 vA: 00 vB: 00
    /// vC: 00 vD: 00 vE: 00 vF: 00
    /// DLY: 0, SND: 0, CYC:      0
    /// ```
    pub fn dump(&self) {
        std::println!(
            "PC: {:04x}, SP: {:04x}, I: {:04x}\n{}DLY: {}, SND: {}, CYC: {:6}",
            self.pc,
            self.sp,
            self.i,
            self.v
                .into_iter()
                .enumerate()
                .map(|(i, gpr)| {
                    format!(
                        "v{i:X}: {gpr:02x} {}",
                        match i % 4 {
                            3 => "\n",
                            _ => "",
                        }
                    )
                })
                .collect::<String>(),
            self.delay,
            self.sound,
            self.cycle,
        );
    }
}

// internals shared with the executor
impl CPU {
    /// Fetches and decodes the big-endian word at pc
    fn fetch(&self) -> Result<Instruction> {
        let range = self.span(self.pc as usize, 2)?;
        Ok(Instruction::from_be_bytes([
            self.memory[range.start],
            self.memory[range.start + 1],
        ]))
    }

    /// Checks that `len` bytes starting at `start` are all addressable
    fn span(&self, start: usize, len: usize) -> Result<Range<usize>> {
        match start.checked_add(len) {
            Some(end) if end <= MEMORY_SIZE => Ok(start..end),
            _ => Err(Error::OutOfBounds {
                addr: start.max(MEMORY_SIZE),
            }),
        }
    }

    /// Decrements both timers, and reports whether the sound timer just ran out
    fn tick_timers(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);
        let beep = self.sound == 1;
        self.sound = self.sound.saturating_sub(1);
        if beep {
            trace!("beep at cycle {}", self.cycle);
        }
        beep
    }
}

impl Debug for CPU {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CPU")
            .field("flags", &self.flags)
            .field("stack", &self.stack())
            .field("pc", &self.pc)
            .field("i", &self.i)
            .field("v", &self.v)
            .field("delay", &self.delay)
            .field("sound", &self.sound)
            .field("keys", &self.keys)
            .field("cycle", &self.cycle)
            .field("disassembler", &self.disassembler)
            .finish_non_exhaustive()
    }
}

impl Default for CPU {
    /// Constructs a new CPU with sane defaults
    ///
    /// | value  | default | description
    /// |--------|---------|------------
    /// | font   |`0x0000` | Location of font memory.
    /// | pc     |`0x0200` | Start location.
    ///
    /// # Examples
    /// ```rust
    /// use chip8vm::*;
    /// let mut cpu = CPU::default();
    /// assert_eq!(0x200, cpu.pc());
    /// assert_eq!(&FONT, &cpu.memory()[..80]);
    /// ```
    fn default() -> Self {
        let mut cpu = CPU {
            flags: Flags::default(),
            memory: [0; MEMORY_SIZE],
            stack: [0; STACK_DEPTH],
            sp: 0,
            pc: PROGRAM_START,
            i: 0,
            v: [0; 16],
            delay: 0,
            sound: 0,
            keys: [false; 16],
            screen: Screen::default(),
            quit: QuitSignal::default(),
            cycle: 0,
            disassembler: Dis::default(),
        };
        cpu.initialize();
        cpu
    }
}
