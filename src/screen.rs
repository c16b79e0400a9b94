// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Stores and displays the Chip-8's framebuffer

use std::fmt::{Display, Formatter, Result};

/// Width of the screen, in pixels
pub const WIDTH: usize = 64;
/// Height of the screen, in pixels
pub const HEIGHT: usize = 32;

/// A 64x32 monochrome framebuffer. Every pixel is exactly 0 or 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Screen {
    pixels: [[u8; WIDTH]; HEIGHT],
}

impl Default for Screen {
    fn default() -> Self {
        Screen {
            pixels: [[0; WIDTH]; HEIGHT],
        }
    }
}

impl Screen {
    /// Turns every pixel off
    pub fn clear(&mut self) {
        self.pixels = [[0; WIDTH]; HEIGHT];
    }

    /// Gets the pixel at (x, y), or None if it's off-screen
    /// # Examples
    /// ```rust
    /// # use chip8vm::*;
    /// let screen = Screen::default();
    /// assert_eq!(Some(0), screen.get(63, 31));
    /// assert_eq!(None, screen.get(64, 0));
    /// ```
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.pixels.get(y)?.get(x).copied()
    }

    /// XORs the pixel at (x, y) with 1, and reports whether it was lit before.
    ///
    /// Off-screen coordinates are ignored, and report false.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        match self.pixels.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(pixel) => {
                let was_lit = *pixel == 1;
                *pixel ^= 1;
                was_lit
            }
            None => false,
        }
    }

    /// Gets a read-only view of every row, top to bottom
    pub fn rows(&self) -> &[[u8; WIDTH]; HEIGHT] {
        &self.pixels
    }

    /// Counts the lit pixels
    pub fn lit(&self) -> usize {
        self.pixels.iter().flatten().filter(|&&p| p == 1).count()
    }
}

impl Display for Screen {
    /// Renders the screen as text, one line per row
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for row in &self.pixels {
            for &pixel in row {
                write!(f, "{}", if pixel == 1 { '█' } else { ' ' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
