// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)
#![allow(missing_docs)]
//! Platform-specific IO/UI code, and some debug functionality.

use crate::error::Result;
use chip8vm::{KeyEdge, KeyInput, Screen, CPU, HEIGHT, WIDTH};
use log::info;
use minifb::*;
use std::{path::Path, time::Duration, time::Instant};

#[derive(Clone, Debug)]
pub struct UIBuilder {
    pub width: usize,
    pub height: usize,
    pub name: Option<String>,
    pub window_options: WindowOptions,
}

impl UIBuilder {
    pub fn new(width: usize, height: usize, rom: impl AsRef<Path>) -> Self {
        UIBuilder {
            width,
            height,
            name: rom
                .as_ref()
                .file_name()
                .map(|name| format!("chip8: {}", name.to_string_lossy())),
            ..Default::default()
        }
    }
    pub fn build(&self) -> Result<UI> {
        let ui = UI {
            window: Window::new(
                self.name.as_deref().unwrap_or("chip8"),
                self.width,
                self.height,
                self.window_options,
            )?,
            keyboard: Default::default(),
            fb: FrameBuffer::new(self.width, self.height),
            time: Instant::now(),
        };
        Ok(ui)
    }
}

impl Default for UIBuilder {
    fn default() -> Self {
        UIBuilder {
            width: WIDTH,
            height: HEIGHT,
            name: None,
            window_options: WindowOptions {
                title: true,
                resize: false,
                scale: Scale::X16,
                scale_mode: ScaleMode::AspectRatioStretch,
                none: true,
                ..Default::default()
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameBufferFormat {
    pub fg: u32,
    pub bg: u32,
}

impl Default for FrameBufferFormat {
    fn default() -> Self {
        FrameBufferFormat {
            fg: 0x0011a434,
            bg: 0x001E2431,
        }
    }
}

/// A window-sized buffer of 0RGB pixels, scaled up from the [Screen]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameBuffer {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    format: FrameBufferFormat,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            buffer: vec![0x00be4d; width * height],
            width,
            height,
            format: Default::default(),
        }
    }
    /// Paints the [Screen] into the buffer, nearest-neighbor scaled
    pub fn draw(&mut self, screen: &Screen) {
        for (idx, pixel) in self.buffer.iter_mut().enumerate() {
            let (x, y) = (idx % self.width, idx / self.width);
            let lit = screen.get(x * WIDTH / self.width, y * HEIGHT / self.height);
            *pixel = match lit {
                Some(1) => self.format.fg,
                _ => self.format.bg,
            };
        }
    }
    pub fn render(&mut self, window: &mut Window, screen: &Screen) -> Result<()> {
        self.draw(screen);
        window.update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }
    #[allow(dead_code)] // used in tests
    pub fn pixels(&self) -> &[u32] {
        &self.buffer
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(WIDTH, HEIGHT)
    }
}

/// The window, and the keys that were down on the last poll
#[derive(Debug)]
pub struct UI {
    window: Window,
    keyboard: Vec<Key>,
    fb: FrameBuffer,
    time: Instant,
}

impl UI {
    /// Presents the screen. Returns false once the window has been closed.
    pub fn frame(&mut self, cpu: &CPU) -> Result<bool> {
        if cpu.flags.pause {
            self.window.set_title("chip8 ⏸")
        } else {
            self.window.set_title(&format!(
                "chip8  ▶ {:02.02}",
                (1.0 / self.time.elapsed().as_secs_f64())
            ));
        }
        if !self.window.is_open() {
            return Ok(false);
        }
        self.time = Instant::now();
        self.fb.render(&mut self.window, cpu.screen())?;
        Ok(true)
    }

    /// Diffs the keys that are down now against the last poll
    fn edges(&mut self) -> Vec<(Key, bool)> {
        let down = self.window.get_keys();
        let released = self
            .keyboard
            .iter()
            .filter(|key| !down.contains(key))
            .map(|&key| (key, false));
        let pressed = down
            .iter()
            .filter(|key| !self.keyboard.contains(key))
            .map(|&key| (key, true));
        let edges = released.chain(pressed).collect();
        self.keyboard = down;
        edges
    }

    /// Feeds the keypad, and handles the debug keybinds.
    /// Returns false when the user asks to quit.
    pub fn keys(&mut self, cpu: &mut CPU) -> Result<bool> {
        for (key, pressed) in self.edges() {
            use Key::*;
            if !pressed {
                if let Some(key) = identify_key(key) {
                    cpu.release(key)?;
                }
                continue;
            }
            match key {
                F1 | Comma => cpu.dump(),
                F2 | Period => eprintln!("{}", cpu.screen()),
                F4 | Slash => {
                    cpu.flags.debug();
                    info!("Debug {}.", if cpu.flags.debug { "enabled" } else { "disabled" });
                }
                F5 | Backslash => {
                    cpu.flags.pause();
                    info!("{}.", if cpu.flags.pause { "Paused" } else { "Unpaused" });
                }
                F6 | Enter => {
                    info!("Step");
                    let cycle = cpu.singlestep(self);
                    if let Some(fault) = cycle.fault {
                        log::warn!("{fault}");
                    }
                }
                F9 | Delete => {
                    info!("Soft reset at {:03x}", cpu.pc());
                    cpu.reset();
                }
                Escape => return Ok(false),
                key => {
                    if let Some(key) = identify_key(key) {
                        cpu.press(key)?;
                    }
                }
            }
        }
        Ok(self.window.is_open())
    }
}

impl KeyInput for UI {
    /// Pumps the window's event loop, and reports keypad edges
    fn poll_key_edges(&mut self) -> Vec<KeyEdge> {
        self.window.update();
        let edges: Vec<KeyEdge> = self
            .edges()
            .into_iter()
            .filter_map(|(key, pressed)| Some((identify_key(key)? as u8, pressed)))
            .collect();
        if edges.is_empty() {
            std::thread::sleep(Duration::from_millis(1));
        }
        edges
    }
    fn quit_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}

pub fn identify_key(key: Key) -> Option<usize> {
    match key {
        Key::Key1 => Some(0x1),
        Key::Key2 => Some(0x2),
        Key::Key3 => Some(0x3),
        Key::Key4 => Some(0xc),
        Key::Q => Some(0x4),
        Key::W => Some(0x5),
        Key::E => Some(0x6),
        Key::R => Some(0xD),
        Key::A => Some(0x7),
        Key::S => Some(0x8),
        Key::D => Some(0x9),
        Key::F => Some(0xE),
        Key::Z => Some(0xA),
        Key::X => Some(0x0),
        Key::C => Some(0xB),
        Key::V => Some(0xF),
        _ => None,
    }
}
