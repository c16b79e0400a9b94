// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE.txt for details)

//! This crate implements a Chip-8 virtual machine as if it were a real CPU architecture:
//! 4K of memory, sixteen 8-bit registers, a 16-deep call stack, two timers,
//! a hex keypad, and a 64x32 monochrome screen.
//!
//! The [CPU] owns all of that state. Hosts drive it one [Cycle] at a time with
//! [CPU::step], present its [Screen], and feed it keys through [CPU::set_key] and
//! the [KeyInput] port.

pub mod cpu;
pub mod error;
pub mod io;
pub mod screen;

// Common imports for chip8vm
pub use cpu::{
    flags::Flags,
    instruction::{
        disassembler::{Dis, Disassembler},
        Insn, Instruction,
    },
    Cycle, CPU, FONT, MEMORY_SIZE, PROGRAM_START, STACK_DEPTH,
};
pub use error::{Error, Result};
pub use io::{KeyEdge, KeyInput, KeyQueue, NoInput, QuitSignal, SharedKeys};
pub use screen::{Screen, HEIGHT, WIDTH};
