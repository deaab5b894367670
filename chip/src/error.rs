use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("Invalid memory access '{0}'.")]
    Memory(#[from] MemoryError),
    #[error("There is no key {0:#04X} on the keypad.")]
    InvalidKey(u8),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
    #[error("Pointer location invalid there can not be an opcode at {pointer:#06X}, if data len is {len:#06X}")]
    MemoryInvalid { pointer: usize, len: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum MemoryError {
    #[error("Address {address:#06X} is outside of the {len:#06X} bytes of memory")]
    OutOfBounds { address: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read the program: {0}")]
    Io(#[from] std::io::Error),
    #[error("The program has at least {size} bytes, but only {max} bytes fit into memory.")]
    TooLarge { size: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("The machine stopped: {0}")]
    Process(#[from] ProcessError),
    #[error("A device failed: {0}")]
    Device(#[from] std::io::Error),
}
