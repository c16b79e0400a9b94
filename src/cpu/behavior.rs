// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Contains implementations for each Chip-8 instruction

use super::*;
use crate::screen::{HEIGHT, WIDTH};
use rand::random;

/// What an instruction asks of the cycle driver, beyond its state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Effect {
    /// Nothing to report
    Continue,
    /// The framebuffer changed
    Redraw,
    /// A key-wait was abandoned because the host wants to quit
    Quit,
}

impl Effect {
    pub(super) fn apply(self, cycle: &mut Cycle) {
        match self {
            Effect::Continue => (),
            Effect::Redraw => cycle.redraw = true,
            Effect::Quit => cycle.quit = true,
        }
    }
}

impl CPU {
    /// Executes a single [Instruction]
    ///
    /// Dispatches on the class nibble first; classes `0`, `8`, `e`, and `f`
    /// dispatch again on the whole word, the low nibble, and the low byte.
    #[rustfmt::skip]
    pub(super) fn execute(&mut self, insn: Instruction, input: &mut impl KeyInput) -> Result<Effect> {
        let Instruction { word, class, address: a, x, y, byte: b, nibble: n } = insn;
        let invalid = Error::InvalidOpcode { word };
        match class {
            0x0 => match word {
                0x00e0          => return Ok(self.clear_screen()),
                0x00ee          => self.ret(),
                _               => self.sys(a),
            },
            0x1                 => self.jump(a),
            0x2                 => self.call(a)?,
            0x3                 => self.skip_equals_immediate(x, b),
            0x4                 => self.skip_not_equals_immediate(x, b),
            0x5 if n == 0       => self.skip_equals(x, y),
            0x6                 => self.load_immediate(x, b),
            0x7                 => self.add_immediate(x, b),
            0x8 => match n {
                0x0             => self.load(x, y),
                0x1             => self.or(x, y),
                0x2             => self.and(x, y),
                0x3             => self.xor(x, y),
                0x4             => self.add(x, y),
                0x5             => self.sub(x, y),
                0x6             => self.shift_right(x),
                0x7             => self.backwards_sub(x, y),
                0xe             => self.shift_left(x),
                _               => return Err(invalid),
            },
            0x9 if n == 0       => self.skip_not_equals(x, y),
            0xa                 => self.load_i_immediate(a),
            0xb                 => self.jump_indexed(a),
            0xc                 => self.rand(x, b),
            0xd                 => return self.draw(x, y, n),
            0xe => match b {
                0x9e            => self.skip_key_equals(x)?,
                0xa1            => self.skip_key_not_equals(x)?,
                _               => return Err(invalid),
            },
            0xf => match b {
                0x07            => self.load_delay_timer(x),
                0x0a            => return Ok(self.wait_for_key(x, input)),
                0x15            => self.store_delay_timer(x),
                0x18            => self.store_sound_timer(x),
                0x1e            => self.add_i(x),
                0x29            => self.load_sprite(x),
                0x33            => self.bcd_convert(x)?,
                0x55            => self.store_dma(x)?,
                0x65            => self.load_dma(x)?,
                _               => return Err(invalid),
            },
            _                   => return Err(invalid),
        }
        Ok(Effect::Continue)
    }

    /// Moves on to the next instruction
    #[inline(always)]
    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Skips the next instruction if `condition` holds, else moves on to it
    #[inline(always)]
    fn skip_if(&mut self, condition: bool) {
        self.pc = self.pc.wrapping_add(if condition { 4 } else { 2 });
    }
}

/// |`0aaa`| Issues a "System call" (ML routine)
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`00e0`| Clear screen memory to all 0       |
/// |`00ee`| Return from subroutine             |
impl CPU {
    /// |`00e0`| Clears the screen memory to 0
    #[inline(always)]
    pub(super) fn clear_screen(&mut self) -> Effect {
        self.screen.clear();
        self.advance();
        Effect::Redraw
    }
    /// |`00ee`| Returns from subroutine
    ///
    /// Returning with an empty stack does nothing at all, not even advance pc.
    #[inline(always)]
    pub(super) fn ret(&mut self) {
        if self.sp > 0 {
            self.sp -= 1;
            self.pc = self.stack[self.sp];
        }
    }
    /// |`0aaa`| Machine-code routines aren't supported. Does nothing at all,
    /// not even advance pc, so a program that runs into zeroed memory parks there.
    #[inline(always)]
    pub(super) fn sys(&mut self, _a: Adr) {}
}

/// |`1aaa`| Sets pc to an absolute address
impl CPU {
    /// |`1aaa`| Sets the program counter to an absolute address
    #[inline(always)]
    pub(super) fn jump(&mut self, a: Adr) {
        self.pc = a;
    }
}

/// |`2aaa`| Pushes pc+2 onto the stack, then jumps to a
impl CPU {
    /// |`2aaa`| Pushes pc+2 onto the stack, then jumps to a
    ///
    /// A full stack wraps around and overwrites the oldest return address,
    /// unless [Flags::strict] is set.
    #[inline(always)]
    pub(super) fn call(&mut self, a: Adr) -> Result<()> {
        if self.sp >= STACK_DEPTH {
            if self.flags.strict {
                return Err(Error::StackOverflow { addr: a });
            }
            self.sp = 0;
        }
        self.stack[self.sp] = self.pc.wrapping_add(2);
        self.sp += 1;
        self.pc = a;
        Ok(())
    }
}

/// |`3xbb`| Skips next instruction if register X == b
impl CPU {
    /// |`3xbb`| Skips the next instruction if register X == b
    #[inline(always)]
    pub(super) fn skip_equals_immediate(&mut self, x: Reg, b: u8) {
        self.skip_if(self.v[x] == b)
    }
}

/// |`4xbb`| Skips next instruction if register X != b
impl CPU {
    /// |`4xbb`| Skips the next instruction if register X != b
    #[inline(always)]
    pub(super) fn skip_not_equals_immediate(&mut self, x: Reg, b: u8) {
        self.skip_if(self.v[x] != b)
    }
}

/// |`5xyn`| Performs a register-register comparison
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`5XY0`| Skip next instruction if vX == vY  |
impl CPU {
    /// |`5xy0`| Skips the next instruction if register X == register Y
    #[inline(always)]
    pub(super) fn skip_equals(&mut self, x: Reg, y: Reg) {
        self.skip_if(self.v[x] == self.v[y])
    }
}

/// |`6xbb`| Loads immediate byte b into register vX
impl CPU {
    /// |`6xbb`| Loads immediate byte b into register vX
    #[inline(always)]
    pub(super) fn load_immediate(&mut self, x: Reg, b: u8) {
        self.v[x] = b;
        self.advance();
    }
}

/// |`7xbb`| Adds immediate byte b to register vX
impl CPU {
    /// |`7xbb`| Adds immediate byte b to register vX. Never touches vF.
    #[inline(always)]
    pub(super) fn add_immediate(&mut self, x: Reg, b: u8) {
        self.v[x] = self.v[x].wrapping_add(b);
        self.advance();
    }
}

/// |`8xyn`| Performs ALU operation
///
/// The flag is always written *before* the result, so when X or Y is vF the
/// result sees (or overwrites) the new flag.
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`8xy0`| X = Y                              |
/// |`8xy1`| X = X | Y                          |
/// |`8xy2`| X = X & Y                          |
/// |`8xy3`| X = X ^ Y                          |
/// |`8xy4`| X = X + Y; Set vF=carry            |
/// |`8xy5`| X = X - Y; Set vF=!borrow          |
/// |`8xy6`| X = X >> 1; Set vF=bit 0           |
/// |`8xy7`| X = Y - X; Set vF=!borrow          |
/// |`8xyE`| X = X << 1; Set vF=bit 7 (as 0x80) |
impl CPU {
    /// |`8xy0`| Loads the value of y into x
    #[inline(always)]
    pub(super) fn load(&mut self, x: Reg, y: Reg) {
        self.v[x] = self.v[y];
        self.advance();
    }
    /// |`8xy1`| Performs bitwise or of vX and vY, and stores the result in vX
    #[inline(always)]
    pub(super) fn or(&mut self, x: Reg, y: Reg) {
        self.v[x] |= self.v[y];
        self.advance();
    }
    /// |`8xy2`| Performs bitwise and of vX and vY, and stores the result in vX
    #[inline(always)]
    pub(super) fn and(&mut self, x: Reg, y: Reg) {
        self.v[x] &= self.v[y];
        self.advance();
    }
    /// |`8xy3`| Performs bitwise xor of vX and vY, and stores the result in vX
    #[inline(always)]
    pub(super) fn xor(&mut self, x: Reg, y: Reg) {
        self.v[x] ^= self.v[y];
        self.advance();
    }
    /// |`8xy4`| Performs addition of vX and vY, and stores the result in vX
    #[inline(always)]
    pub(super) fn add(&mut self, x: Reg, y: Reg) {
        let carry = self.v[x].checked_add(self.v[y]).is_none();
        self.v[0xf] = carry.into();
        self.v[x] = self.v[x].wrapping_add(self.v[y]);
        self.advance();
    }
    /// |`8xy5`| Performs subtraction of vX and vY, and stores the result in vX
    #[inline(always)]
    pub(super) fn sub(&mut self, x: Reg, y: Reg) {
        let borrow = self.v[y] > self.v[x];
        self.v[0xf] = (!borrow).into();
        self.v[x] = self.v[x].wrapping_sub(self.v[y]);
        self.advance();
    }
    /// |`8xy6`| Performs bitwise right shift of vX
    #[inline(always)]
    pub(super) fn shift_right(&mut self, x: Reg) {
        self.v[0xf] = self.v[x] & 1;
        self.v[x] >>= 1;
        self.advance();
    }
    /// |`8xy7`| Performs subtraction of vY and vX, and stores the result in vX
    #[inline(always)]
    pub(super) fn backwards_sub(&mut self, x: Reg, y: Reg) {
        let borrow = self.v[x] > self.v[y];
        self.v[0xf] = (!borrow).into();
        self.v[x] = self.v[y].wrapping_sub(self.v[x]);
        self.advance();
    }
    /// |`8xyE`| Performs bitwise left shift of vX
    ///
    /// # Quirk
    /// vF receives the shifted-out bit *in place*: `0x80`, not `1`.
    /// Programs written against this interpreter may depend on it.
    #[inline(always)]
    pub(super) fn shift_left(&mut self, x: Reg) {
        self.v[0xf] = self.v[x] & 0x80;
        self.v[x] <<= 1;
        self.advance();
    }
}

/// |`9xyn`| Performs a register-register comparison
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`9XY0`| Skip next instruction if vX != vY  |
impl CPU {
    /// |`9xy0`| Skip next instruction if X != y
    #[inline(always)]
    pub(super) fn skip_not_equals(&mut self, x: Reg, y: Reg) {
        self.skip_if(self.v[x] != self.v[y])
    }
}

/// |`Aaaa`| Load address #a into register I
impl CPU {
    /// |`Aadr`| Load address #adr into register I
    #[inline(always)]
    pub(super) fn load_i_immediate(&mut self, a: Adr) {
        self.i = a;
        self.advance();
    }
}

/// |`Baaa`| Jump forward by &adr + v0
impl CPU {
    /// |`Badr`| Jump forward by &adr + v0
    ///
    /// # Quirk
    /// The target is relative to the *current* pc, rather than to address 0.
    #[inline(always)]
    pub(super) fn jump_indexed(&mut self, a: Adr) {
        self.pc = self.pc.wrapping_add(a).wrapping_add(self.v[0] as Adr);
    }
}

/// |`Cxbb`| Stores a random number & the provided byte into vX
impl CPU {
    /// |`Cxbb`| Stores a random number & the provided byte into vX
    #[inline(always)]
    pub(super) fn rand(&mut self, x: Reg, b: u8) {
        self.v[x] = random::<u8>() & b;
        self.advance();
    }
}

/// |`Dxyn`| Draws n-byte sprite to the screen at coordinates (vX, vY)
impl CPU {
    /// |`Dxyn`| Draws n-byte sprite to the screen at coordinates (vX, vY)
    ///
    /// Sprites are XORed onto the screen, and clipped (not wrapped) at the
    /// right and bottom edges. vF is set if any lit pixel was turned off.
    ///
    /// Only the rows that land on screen are read from memory, and they're
    /// checked before anything is drawn, so a fault leaves the screen and vF alone.
    #[inline(always)]
    pub(super) fn draw(&mut self, x: Reg, y: Reg, n: Nib) -> Result<Effect> {
        let (x, y) = (self.v[x] as usize, self.v[y] as usize);
        let rows = (n as usize).min(HEIGHT.saturating_sub(y));
        let sprite = match rows {
            0 => 0..0,
            _ => self.span(self.i as usize, rows)?,
        };
        self.v[0xf] = 0;
        for (line, &row) in self.memory[sprite].iter().enumerate() {
            for bit in 0..8 {
                if row & (0x80 >> bit) == 0 || x + bit >= WIDTH {
                    continue;
                }
                if self.screen.toggle(x + bit, y + line) {
                    self.v[0xf] = 1;
                }
            }
        }
        self.advance();
        Ok(Effect::Redraw)
    }
}

/// |`Exbb`| Skips instruction on value of keypress
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`eX9e`| Skip next instruction if key == vX |
/// |`eXa1`| Skip next instruction if key != vX |
impl CPU {
    /// |`Ex9E`| Skip next instruction if key == vX
    #[inline(always)]
    pub(super) fn skip_key_equals(&mut self, x: Reg) -> Result<()> {
        let key = self.key_index(x)?;
        self.skip_if(self.keys[key]);
        Ok(())
    }
    /// |`ExA1`| Skip next instruction if key != vX
    #[inline(always)]
    pub(super) fn skip_key_not_equals(&mut self, x: Reg) -> Result<()> {
        let key = self.key_index(x)?;
        self.skip_if(!self.keys[key]);
        Ok(())
    }
    /// Turns vX into a key index. Only the low nibble counts, unless
    /// [Flags::strict] is set, in which case anything past `f` is an error.
    #[inline(always)]
    fn key_index(&self, x: Reg) -> Result<usize> {
        let key = self.v[x] as usize;
        match key < self.keys.len() {
            false if self.flags.strict => Err(Error::InvalidKey { key }),
            _ => Ok(key & 0xf),
        }
    }
}

/// |`Fxbb`| Performs IO
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`fX07`| Set vX to value in delay timer     |
/// |`fX0a`| Wait for input, store key in vX    |
/// |`fX15`| Set delay timer to the value in vX |
/// |`fX18`| Set sound timer to the value in vX |
/// |`fX1e`| Add vX to I                        |
/// |`fX29`| Load sprite for character x into I |
/// |`fX33`| BCD convert X into I[0..3]         |
/// |`fX55`| DMA Stor from I to registers 0..=X |
/// |`fX65`| DMA Load from I to registers 0..=X |
impl CPU {
    /// |`Fx07`| Get the current DT, and put it in vX
    /// ```py
    /// vX = DT
    /// ```
    #[inline(always)]
    pub(super) fn load_delay_timer(&mut self, x: Reg) {
        self.v[x] = self.delay;
        self.advance();
    }
    /// |`Fx0A`| Wait for key, then vX = K
    ///
    /// Blocks, polling `input` for key edges. Every edge updates the keypad;
    /// the first key to go *down* ends the wait. A quit request from `input` or
    /// from [CPU::request_quit] abandons the wait, leaving pc on this instruction.
    pub(super) fn wait_for_key(&mut self, x: Reg, input: &mut impl KeyInput) -> Effect {
        loop {
            if input.quit_requested() || self.quit.is_set() {
                return Effect::Quit;
            }
            let mut first_press = None;
            for (code, pressed) in input.poll_key_edges() {
                if let Some(key) = self.keys.get_mut(code as usize) {
                    *key = pressed;
                    if pressed && first_press.is_none() {
                        first_press = Some(code);
                    }
                }
            }
            if let Some(code) = first_press {
                self.v[x] = code;
                self.advance();
                return Effect::Continue;
            }
        }
    }
    /// |`Fx15`| Load vX into DT
    /// ```py
    /// DT = vX
    /// ```
    #[inline(always)]
    pub(super) fn store_delay_timer(&mut self, x: Reg) {
        self.delay = self.v[x];
        self.advance();
    }
    /// |`Fx18`| Load vX into ST
    /// ```py
    /// ST = vX;
    /// ```
    #[inline(always)]
    pub(super) fn store_sound_timer(&mut self, x: Reg) {
        self.sound = self.v[x];
        self.advance();
    }
    /// |`Fx1e`| Add vX to I, setting vF on 16-bit overflow
    /// ```py
    /// vF = I + vX > 0xffff
    /// I += vX;
    /// ```
    #[inline(always)]
    pub(super) fn add_i(&mut self, x: Reg) {
        let carry = self.i.checked_add(self.v[x] as Adr).is_none();
        self.v[0xf] = carry.into();
        self.i = self.i.wrapping_add(self.v[x] as Adr);
        self.advance();
    }
    /// |`Fx29`| Load sprite for character x into I
    /// ```py
    /// I = vX * 5;
    /// ```
    #[inline(always)]
    pub(super) fn load_sprite(&mut self, x: Reg) {
        self.i = self.v[x] as Adr * GLYPH_SIZE as Adr;
        self.advance();
    }
    /// |`Fx33`| BCD convert X into I`[0..3]`
    #[inline(always)]
    pub(super) fn bcd_convert(&mut self, x: Reg) -> Result<()> {
        let range = self.span(self.i as usize, 3)?;
        let x = self.v[x];
        self.memory[range].copy_from_slice(&[x / 100, x / 10 % 10, x % 10]);
        self.advance();
        Ok(())
    }
    /// |`Fx55`| DMA Stor from I to registers 0..=X
    ///
    /// I is left unchanged.
    #[inline(always)]
    pub(super) fn store_dma(&mut self, x: Reg) -> Result<()> {
        let range = self.span(self.i as usize, x + 1)?;
        self.memory[range].copy_from_slice(&self.v[..=x]);
        self.advance();
        Ok(())
    }
    /// |`Fx65`| DMA Load from I to registers 0..=X
    ///
    /// I is left unchanged.
    #[inline(always)]
    pub(super) fn load_dma(&mut self, x: Reg) -> Result<()> {
        let range = self.span(self.i as usize, x + 1)?;
        self.v[..=x].copy_from_slice(&self.memory[range]);
        self.advance();
        Ok(())
    }
}
