use std::io;

use crate::definitions::{display, keyboard};

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will display all the pixels of the given frame
    fn display(&mut self, frame: &Framebuffer) -> io::Result<()>;
}

/// An event delivered by the host input, already translated to the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A keypad key in `0x0..=0xF` changed its state
    Key { key: u8, pressed: bool },
    /// The host asked for the machine to stop
    Quit,
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for reading the keyboard data
pub trait InputCommands {
    /// Returns the next pending event without blocking.
    fn poll(&mut self) -> io::Result<Option<InputEvent>>;

    /// Blocks until the next event arrives.
    fn wait(&mut self) -> io::Result<InputEvent>;
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for presenting the beep, for hosts whose audio is
/// not driven by a callback of its own.
pub trait SpeakerCommands {
    /// Called once per cycle after the timers were handled.
    fn update(&mut self) -> io::Result<()>;
}

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`. Each cell holds `0` or `1`, stored row after row.
#[derive(Clone)]
pub struct Framebuffer {
    pixels: [u8; display::RESOLUTION],
    /// set whenever the buffer changed since it was last presented
    dirty: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            pixels: [0; display::RESOLUTION],
            dirty: false,
        }
    }

    /// Sets every pixel to `0`.
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = 0);
        self.dirty = true;
    }

    /// Will xor a set pixel into the given coordinates, wrapping them around the
    /// screen edges. Returns true if the pixel was set before, so it just got erased.
    pub fn flip(&mut self, x: usize, y: usize) -> bool {
        let index = (y % display::HEIGHT) * display::WIDTH + (x % display::WIDTH);
        let was_set = self.pixels[index] == 1;
        self.pixels[index] ^= 1;
        was_set
    }

    /// Returns the pixel at the given coordinates, wrapping them around.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[(y % display::HEIGHT) * display::WIDTH + (x % display::WIDTH)]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Iterates over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks(display::WIDTH)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called by the presentation once the current content has been shown.
    pub fn mark_presented(&mut self) {
        self.dirty = false;
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Will store the internal keyboard representation
///
/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    /// Sets the state of a key, returns false if there is no such key.
    pub fn set_key(&mut self, key: usize, to: bool) -> bool {
        match self.keys.get_mut(key) {
            Some(state) => {
                *state = to;
                true
            }
            None => false,
        }
    }

    /// Returns the state of the key, or `None` if there is no such key.
    pub fn is_pressed(&self, key: usize) -> Option<bool> {
        self.keys.get(key).copied()
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }
}
