//! The terminal front end: the screen is drawn with half block glyphs, the keypad is
//! read from the key events and the beep rings the bell.
mod display;
mod input;
mod speaker;

pub use display::*;
pub use input::*;
pub use speaker::*;
