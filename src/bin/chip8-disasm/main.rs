// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! chip8-disasm: prints a ROM as Chip-8 assembly

use chip8vm::*;
use gumdrop::*;
use log::{debug, warn};
use owo_colors::OwoColorize;
use std::{fs::read, path::PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Show help text")]
    help: bool,
    #[options(help = "Load a ROM to disassemble", free, required)]
    pub file: PathBuf,
    #[options(
        help = "Load address (usually 200)",
        parse(try_from_str = "parse_hex"),
        default = "200"
    )]
    pub loadaddr: u16,
    #[options(help = "Start disassembling at offset...")]
    pub offset: usize,
    #[options(help = "Don't color the output")]
    pub plain: bool,
}

fn parse_hex(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(value, 16)
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let options = Arguments::parse_args_default_or_exit();
    let contents = read(&options.file)?;
    debug!("Read {} bytes from {}", contents.len(), options.file.display());
    let disassembler = match options.plain {
        true => Dis::plain(),
        false => Dis::default(),
    };
    let body = contents.get(options.offset..).unwrap_or_default();
    let chunks = body.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        warn!("Ignoring trailing odd byte at offset {:x}", contents.len() - 1);
    }
    for (addr, insn) in chunks.enumerate() {
        let insn = u16::from_be_bytes([insn[0], insn[1]]);
        let addr = 2 * addr + options.loadaddr as usize + options.offset;
        match options.plain {
            true => println!("{addr:03x}: {} {insn:04x}", disassembler.once(insn)),
            false => println!(
                "{:03x}: {} {:04x}",
                addr,
                disassembler.once(insn),
                insn.bright_black(),
            ),
        }
    }
    Ok(())
}
