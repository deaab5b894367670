//! The full implementation of the chip8 machine, from its state to the opcodes.
mod chipset;
mod opcodes;

/// reexport chipset structs and data for simpler usage
pub use chipset::*;
