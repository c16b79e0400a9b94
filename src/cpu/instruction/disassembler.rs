// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! A disassembler for Chip-8 opcodes
use super::{Insn, Instruction};
use imperative_rs::InstructionSet;
use owo_colors::{OwoColorize, Style};

/// Disassembles Chip-8 instructions
pub trait Disassembler {
    /// Disassemble a single instruction
    fn once(&self, insn: u16) -> String;
}

/// Disassembles Chip-8 instructions, printing them in the provided [owo_colors::Style]s
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dis {
    /// Styles invalid instructions
    pub invalid: Style,
    /// Styles valid instruction
    pub normal: Style,
    /// When false, styles are ignored entirely
    pub styled: bool,
}

impl Dis {
    /// A disassembler that applies no styling at all
    pub fn plain() -> Self {
        Self {
            styled: false,
            ..Default::default()
        }
    }
}

impl Default for Dis {
    fn default() -> Self {
        Self {
            invalid: Style::new().bold().red(),
            normal: Style::new().green(),
            styled: true,
        }
    }
}

impl Disassembler for Dis {
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let dis = Dis::plain();
    /// assert_eq!("cls    ", dis.once(0x00e0));
    /// assert_eq!("sys    $123", dis.once(0x0123));
    /// assert_eq!("inval  ffff", dis.once(0xffff));
    /// ```
    fn once(&self, insn: u16) -> String {
        let (text, style) = if let Ok((_, insn)) = Insn::decode(&insn.to_be_bytes()) {
            (insn.to_string(), self.normal)
        } else if Instruction::decode(insn).class == 0 {
            // legacy machine-code routine; executed as a no-op
            (format!("sys    ${:03x}", insn & 0xfff), self.normal)
        } else {
            (format!("inval  {insn:04x}"), self.invalid)
        };
        match self.styled {
            true => text.style(style).to_string(),
            false => text,
        }
    }
}
