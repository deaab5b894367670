use std::{convert::TryFrom, ops::Range};

use {
    crate::{
        definitions::{cpu, display, memory},
        devices::{Framebuffer, Keyboard},
        opcode::{self, ChipOpcodes, Instruction, Opcode, Operation, ProgramCounter, ProgramCounterStep},
        resources::Rom,
        timer::{NoCallback, Timer, TimerCallback},
        MemoryError, ProcessError, StackError,
    },
    rand::{rngs::StdRng, RngCore, SeedableRng},
    tinyvec::ArrayVec,
};

/// Whether the machine executes instructions or waits for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Every step executes the next instruction
    Running,
    /// `FX0A` is waiting for a key press to store into the register
    WaitKey { register: usize },
}

/// The ChipSet struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct ChipSet<S: TimerCallback = NoCallback> {
    /// name of the loaded rom
    pub(super) name: String,
    /// the last fetched opcode, all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x04F` - Used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x050-0x1FF` - Reserved for the interpreter
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Box<[u8; memory::SIZE]>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: usize,
    /// The stack is only used to store return addresses when subroutines are called. The original
    /// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
    /// `12` levels of nesting; modern implementations usually have more.
    /// (here we are using `16`)
    pub(super) stack: ArrayVec<[usize; cpu::stack::SIZE]>,
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read.
    pub(super) delay_timer: Timer,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made.
    pub(super) sound_timer: Timer<S>,
    /// The `64 x 32` monochrome screen.
    pub(super) display: Framebuffer,
    /// Input is done with a hex keyboard that has 16 keys ranging `0-F`.
    pub(super) keyboard: Keyboard,
    /// This stores the random number generator, used by the chipset.
    /// It is stored into the chipset, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
    /// Running or waiting for a key
    pub(super) state: State,
}

impl ChipSet<NoCallback> {
    /// will create a new chipset object without sound
    pub fn new(rom: &Rom) -> Self {
        Self::with_callback(rom, NoCallback)
    }
}

impl<S: TimerCallback> ChipSet<S> {
    /// will create a new chipset object, the callback is run on every count down
    /// of the sound timer.
    pub fn with_callback(rom: &Rom, callback: S) -> Self {
        // initialize all the memory with 0
        let mut ram = Box::new([0; memory::SIZE]);

        // load fonts
        ram[display::fontset::LOCATION
            ..(display::fontset::LOCATION + display::fontset::FONTSET.len())]
            .copy_from_slice(&display::fontset::FONTSET);

        // write the rom data into memory, the rom guarantees that it fits
        let data = rom.get_data();
        ram[cpu::PROGRAM_COUNTER..(cpu::PROGRAM_COUNTER + data.len())].copy_from_slice(data);

        log::info!("loaded {} with {} bytes", rom.get_name(), data.len());

        Self {
            name: rom.get_name().to_string(),
            opcode: 0,
            memory: ram,
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            stack: ArrayVec::new(),
            delay_timer: Timer::new(0),
            sound_timer: Timer::with_callback(0, callback),
            display: Framebuffer::new(),
            keyboard: Keyboard::new(),
            rng: Box::new(StdRng::from_entropy()),
            state: State::Running,
        }
    }

    /// Replaces the random number generator used by `CXNN`.
    pub fn set_rng<R: RngCore + Send + 'static>(&mut self, rng: R) {
        self.rng = Box::new(rng);
    }

    /// Seeds a fresh random number generator, so that runs can be repeated.
    pub fn seed_rng(&mut self, seed: u64) {
        self.set_rng(StdRng::seed_from_u64(seed));
    }

    /// will get the next opcode from memory and move the program counter past it
    pub(super) fn fetch(&mut self) -> Result<Opcode, ProcessError> {
        // will build the opcode given from the pointer
        self.opcode = opcode::build_opcode(&self.memory[..], self.program_counter)?;
        self.program_counter += memory::opcodes::SIZE;
        Ok(self.opcode)
    }

    /// will advance the program by a single instruction
    ///
    /// While the machine waits for a key nothing is executed.
    pub fn step(&mut self) -> Result<Operation, ProcessError> {
        if let State::WaitKey { .. } = self.state {
            return Ok(Operation::Wait);
        }
        let pc = self.program_counter;
        let opcode = self.fetch()?;
        let instruction = Instruction::try_from(opcode)?;
        log::debug!("{:#06X}: {:#06X} {:?}", pc, opcode, instruction);
        self.calc(&instruction)
    }

    /// Counts both timers down by one.
    pub fn tick_timers(&mut self) {
        self.delay_timer.tick();
        self.sound_timer.tick();
        log::trace!(
            "timers delay {} sound {}",
            self.delay_timer.get_value(),
            self.sound_timer.get_value()
        );
    }

    /// Will set the value of the given key.
    ///
    /// A key press while waiting for a key completes `FX0A`: the key is stored in the
    /// waiting register and released again, so that it doesn't count as held.
    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<(), ProcessError> {
        if !self.keyboard.set_key(key as usize, pressed) {
            return Err(ProcessError::InvalidKey(key));
        }
        if let (State::WaitKey { register }, true) = (self.state, pressed) {
            log::debug!("key {:#X} stored in V{:X}", key, register);
            self.registers[register] = key;
            self.keyboard.set_key(key as usize, false);
            self.state = State::Running;
        }
        Ok(())
    }

    /// Will get the current state of the keyboard
    pub fn get_keyboard(&self) -> &[bool] {
        self.keyboard.get_keys()
    }

    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, State::WaitKey { .. })
    }

    /// will return the sound timer
    pub fn get_sound_timer(&self) -> u8 {
        self.sound_timer.get_value()
    }

    /// will return the delay timer
    pub fn get_delay_timer(&self) -> u8 {
        self.delay_timer.get_value()
    }

    pub fn get_registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn get_index_register(&self) -> u16 {
        self.index_register
    }

    pub fn get_program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn get_memory(&self) -> &[u8] {
        &self.memory[..]
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Will return the current screen content
    pub fn get_display(&self) -> &Framebuffer {
        &self.display
    }

    /// Returns the screen if it changed since the last call, marking it as presented.
    pub fn take_frame(&mut self) -> Option<&Framebuffer> {
        if self.display.is_dirty() {
            self.display.mark_presented();
            Some(&self.display)
        } else {
            None
        }
    }

    /// Will push the current pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: usize) -> Result<(), StackError> {
        match self.stack.try_push(pointer) {
            None => Ok(()),
            Some(_) => Err(StackError::Full),
        }
    }

    /// Will pop from the stack
    pub(super) fn pop_stack(&mut self) -> Result<usize, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }

    /// Returns the memory range `from..from + len`, if it lies inside of the memory.
    pub(super) fn memory_range(&self, from: usize, len: usize) -> Result<Range<usize>, MemoryError> {
        let end = from + len;
        if end > self.memory.len() {
            Err(MemoryError::OutOfBounds {
                address: end - 1,
                len: self.memory.len(),
            })
        } else {
            Ok(from..end)
        }
    }
}

impl<S: TimerCallback> ProgramCounter for ChipSet<S> {
    fn apply_step(&mut self, step: ProgramCounterStep) {
        self.program_counter = step.apply(self.program_counter);
    }
}
