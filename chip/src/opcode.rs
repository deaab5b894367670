//! Opcode abstractions, functionality and constants.
use std::convert::TryFrom;

use crate::{definitions::memory, OpcodeError, ProcessError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a single byte
const BYTE_SIZE: u16 = 0x8;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// will build an opcode from data and the given point
/// # Arguments
///
/// - `data` - A slice of u8 data entries used to generate the opcodes
/// - `pointer` - Where in the data the opcode shall be extracted, so `pointer` and `pointer + 1` make
/// the opcode up (big-endian)
///
/// # Example
/// ```rust
/// # use chip::opcode::*;
/// # use chip::OpcodeError;
///  const OPCODES: [Opcode; 2] = [0x00EE, 0x1EDA];
///  const SPLIT_OPCODE: [u8; 4] = [0x00, 0xEE, 0x1E, 0xDA];
///  for (i, val) in OPCODES.iter().enumerate() {
///      let opcode = build_opcode(&SPLIT_OPCODE, i * 2).expect("This will work.");
///      assert_eq!(opcode, *val);
///  }
/// # let pointer = 3;
/// # let err = OpcodeError::MemoryInvalid {pointer, len: SPLIT_OPCODE.len() };
/// # assert_eq!(
/// #    Err(err),
/// #    build_opcode(&SPLIT_OPCODE, pointer)
/// # );
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, OpcodeError> {
    // controlling that there is no illegal access here
    if pointer + 1 < data.len() {
        Ok(Opcode::from_be_bytes([data[pointer], data[pointer + 1]]))
    } else {
        Err(OpcodeError::MemoryInvalid {
            pointer,
            len: data.len(),
        })
    }
}

/// These are special traits used to filter out information
/// from opcodes
pub trait OpcodeTrait {
    /// the top nibble `T` of any opcode, shifted down to `0x0..=0xF`
    fn t(&self) -> usize;

    /// this is an opcode extractor for the opcode type `TNNN`
    /// - `NNN` is an address
    fn nnn(&self) -> usize;

    /// this is an opcode extractor for the opcode type `TXNN`
    /// - `X` is a register index
    /// - `NN` is a constant
    fn xnn(&self) -> (usize, u8);

    /// this is an opcode extractor for the opcode type `TXYN`
    /// - `X` is a register index
    /// - `Y` is a register index
    /// - `N` is a constant or an opcode subtype
    fn xyn(&self) -> (usize, usize, usize);

    /// this is an opcode extractor for the opcode type `TXYT`
    fn xy(&self) -> (usize, usize);

    /// this is an opcode extractor for the opcode type `TXTT`
    fn x(&self) -> usize;
}

impl OpcodeTrait for Opcode {
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.t(), 0x1);
    /// ```
    fn t(&self) -> usize {
        const SHIFT: u16 = 3 * BYTE_SIZE / 2;
        ((self & OPCODE_MASK_F000) >> SHIFT) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.nnn(), 0xEDA)
    /// ```
    fn nnn(&self) -> usize {
        (self & OPCODE_MASK_0FFF) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xnn(), (0xE, 0xDA));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        let x = self.x();
        let nn = (self & OPCODE_MASK_00FF) as u8;
        (x, nn)
    }

    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.xyn(), (0xE, 0xD, 0xA));
    /// ```
    fn xyn(&self) -> (usize, usize, usize) {
        let (x, y) = self.xy();
        let n = (self & OPCODE_MASK_000F) as usize;
        (x, y, n)
    }

    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.xy(), (0xE, 0xD));
    /// ```
    fn xy(&self) -> (usize, usize) {
        let x = self.x();
        const MASK: u16 = OPCODE_MASK_00FF ^ OPCODE_MASK_000F;
        const NIBBLE: u16 = BYTE_SIZE / 2;
        let y = ((self & MASK) >> NIBBLE) as usize;
        (x, y)
    }

    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.x(), 0xE);
    /// ```
    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> BYTE_SIZE) as usize
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents what happens to the program counter after an instruction ran.
///
/// The counter has already been moved past the instruction during the
/// fetch, so every variant is relative to that position.
pub enum ProgramCounterStep {
    /// Continue with the following instruction
    Next,
    /// Jump over the following instruction
    Skip,
    /// Will simply move the program counter to the given location.
    Jump(usize),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Maps the step onto the already incremented program counter.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next.apply(0x202), 0x202);
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x202), 0x204);
    /// assert_eq!(ProgramCounterStep::Jump(0x300).apply(0x202), 0x300);
    /// ```
    #[inline]
    pub fn apply(&self, pc: usize) -> usize {
        match *self {
            ProgramCounterStep::Next => pc,
            ProgramCounterStep::Skip => pc + memory::opcodes::SIZE,
            ProgramCounterStep::Jump(pointer) => pointer,
        }
    }
}

/// Generates the `TryFrom` boilerplate for the sub opcode tables, so that
/// every table only lists its discriminators.
macro_rules! implSubOpcode {
    ($type_name:ident : $type_from:ty : $( $key:literal => $val:ident ),+ $(,)? ) => {
        impl TryFrom<$type_from> for $type_name {
            type Error = ();

            fn try_from(value: $type_from) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $key => Ok($type_name::$val),
                    )+
                    _ => Err(()),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum System {
    /// Clears the display
    Clear,
    /// Returns from the subroutine
    Return,
}

implSubOpcode!(System : Opcode :
    // 00E0
    0x00E0 => Clear,
    // 00EE
    0x00EE => Return,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Assign,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubReverse,
    ShiftLeft,
}

implSubOpcode!(AluOp : usize :
    // 8XY0
    0x0 => Assign,
    // 8XY1
    0x1 => Or,
    // 8XY2
    0x2 => And,
    // 8XY3
    0x3 => Xor,
    // 8XY4
    0x4 => Add,
    // 8XY5
    0x5 => Sub,
    // 8XY6
    0x6 => ShiftRight,
    // 8XY7
    0x7 => SubReverse,
    // 8XYE
    0xE => ShiftLeft,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOp {
    Pressed,
    NotPressed,
}

implSubOpcode!(KeyOp : u8 :
    // EX9E
    0x9E => Pressed,
    // EXA1
    0xA1 => NotPressed,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscOp {
    GetDelayTimer,
    AwaitKeyPress,
    SetDelayTimer,
    SetSoundTimer,
    AddToIndex,
    FontGlyph,
    StoreBcd,
    StoreRegisters,
    LoadRegisters,
}

implSubOpcode!(MiscOp : u8 :
    // FX07
    0x07 => GetDelayTimer,
    // FX0A
    0x0A => AwaitKeyPress,
    // FX15
    0x15 => SetDelayTimer,
    // FX18
    0x18 => SetSoundTimer,
    // FX1E
    0x1E => AddToIndex,
    // FX29
    0x29 => FontGlyph,
    // FX33
    0x33 => StoreBcd,
    // FX55
    0x55 => StoreRegisters,
    // FX65
    0x65 => LoadRegisters,
);

/// A fully decoded instruction, one variant per opcode family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    System(System),
    Jump { nnn: usize },
    Call { nnn: usize },
    SkipEqual { x: usize, nn: u8 },
    SkipNotEqual { x: usize, nn: u8 },
    SkipRegistersEqual { x: usize, y: usize },
    Load { x: usize, nn: u8 },
    AddConst { x: usize, nn: u8 },
    Alu { op: AluOp, x: usize, y: usize },
    SkipRegistersNotEqual { x: usize, y: usize },
    SetIndex { nnn: usize },
    JumpOffset { nnn: usize },
    Random { x: usize, nn: u8 },
    Draw { x: usize, y: usize, n: usize },
    Key { op: KeyOp, x: usize },
    Misc { op: MiscOp, x: usize },
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    fn try_from(value: Opcode) -> Result<Self, Self::Error> {
        let invalid = |_| OpcodeError::InvalidOpcode(value);

        let res = match value.t() {
            0x0 => Instruction::System(System::try_from(value).map_err(invalid)?),
            0x1 => Instruction::Jump { nnn: value.nnn() },
            0x2 => Instruction::Call { nnn: value.nnn() },
            0x3 => {
                let (x, nn) = value.xnn();
                Instruction::SkipEqual { x, nn }
            }
            0x4 => {
                let (x, nn) = value.xnn();
                Instruction::SkipNotEqual { x, nn }
            }
            0x5 => match value.xyn() {
                (x, y, 0) => Instruction::SkipRegistersEqual { x, y },
                _ => return Err(OpcodeError::InvalidOpcode(value)),
            },
            0x6 => {
                let (x, nn) = value.xnn();
                Instruction::Load { x, nn }
            }
            0x7 => {
                let (x, nn) = value.xnn();
                Instruction::AddConst { x, nn }
            }
            0x8 => {
                let (x, y, n) = value.xyn();
                let op = AluOp::try_from(n).map_err(invalid)?;
                Instruction::Alu { op, x, y }
            }
            0x9 => match value.xyn() {
                (x, y, 0) => Instruction::SkipRegistersNotEqual { x, y },
                _ => return Err(OpcodeError::InvalidOpcode(value)),
            },
            0xA => Instruction::SetIndex { nnn: value.nnn() },
            0xB => Instruction::JumpOffset { nnn: value.nnn() },
            0xC => {
                let (x, nn) = value.xnn();
                Instruction::Random { x, nn }
            }
            0xD => {
                let (x, y, n) = value.xyn();
                Instruction::Draw { x, y, n }
            }
            0xE => {
                let (x, nn) = value.xnn();
                let op = KeyOp::try_from(nn).map_err(invalid)?;
                Instruction::Key { op, x }
            }
            0xF => {
                let (x, nn) = value.xnn();
                let op = MiscOp::try_from(nn).map_err(invalid)?;
                Instruction::Misc { op, x }
            }
            _ => return Err(OpcodeError::InvalidOpcode(value)),
        };
        Ok(res)
    }
}

/// Represents a step of the program counter
/// this requires the enum ProgramCounterStep
/// to work.
pub trait ProgramCounter {
    /// will move the program counter according to the step.
    fn apply_step(&mut self, step: ProgramCounterStep);
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents a command from the interpreter up to the driver.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The machine waits for the next key press
    Wait,
    /// The framebuffer changed
    Draw,
}

/// These are the traits that have to be full filled for a working opcode
/// table.
///
/// This trait requires the implementation of the [`ProgramCounter`](ProgramCounter) trait, as
/// the step each instruction returns is applied through it.
pub trait ChipOpcodes: ProgramCounter {
    /// will execute a single decoded instruction
    fn calc(&mut self, instruction: &Instruction) -> Result<Operation, ProcessError> {
        let mut operation = Operation::None;
        let step_op = |(step, op)| {
            operation = op;
            step
        };

        let step = match *instruction {
            Instruction::System(op) => self.system(op).map(step_op),
            Instruction::Jump { nnn } => self.jump(nnn),
            Instruction::Call { nnn } => self.call(nnn),
            Instruction::SkipEqual { x, nn } => self.skip_equal(x, nn),
            Instruction::SkipNotEqual { x, nn } => self.skip_not_equal(x, nn),
            Instruction::SkipRegistersEqual { x, y } => self.skip_registers_equal(x, y),
            Instruction::Load { x, nn } => self.load(x, nn),
            Instruction::AddConst { x, nn } => self.add_const(x, nn),
            Instruction::Alu { op, x, y } => self.alu(op, x, y),
            Instruction::SkipRegistersNotEqual { x, y } => self.skip_registers_not_equal(x, y),
            Instruction::SetIndex { nnn } => self.set_index(nnn),
            Instruction::JumpOffset { nnn } => self.jump_offset(nnn),
            Instruction::Random { x, nn } => self.random(x, nn),
            Instruction::Draw { x, y, n } => self.draw(x, y, n).map(step_op),
            Instruction::Key { op, x } => self.key(op, x),
            Instruction::Misc { op, x } => self.misc(op, x).map(step_op),
        }?;

        self.apply_step(step);
        Ok(operation)
    }

    /// - `00E0` - Display  - `disp_clear()`        - Clears the screen.
    /// - `00EE` - Flow     - `return;`             - Returns from a subroutine.
    fn system(&mut self, op: System) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `1NNN` - Flow     - `goto NNN;`           - Jumps to address `NNN`.
    fn jump(&self, nnn: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `2NNN` - Flow     - `*(0xNNN)()`          - Calls subroutine at `NNN`.
    fn call(&mut self, nnn: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `3XNN` - Cond     - `if(Vx==NN)`          - Skips the next instruction if `VX` equals `NN`.
    fn skip_equal(&self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `4XNN` - Cond     - `if(Vx!=NN)`          - Skips the next instruction if `VX` doesn't equal `NN`.
    fn skip_not_equal(&self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `5XY0` - Cond     - `if(Vx==Vy)`          - Skips the next instruction if `VX` equals `VY`.
    fn skip_registers_equal(&self, x: usize, y: usize)
        -> Result<ProgramCounterStep, ProcessError>;

    /// - `6XNN` - Const    - `Vx = NN`             - Sets `VX` to `NN`.
    fn load(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `7XNN` - Const    - `Vx += NN`            - Adds `NN` to `VX`. (Carry flag is not changed)
    fn add_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `8XY0` - Assign   - `Vx=Vy`
    /// - `8XY1` - BitOp    - `Vx=Vx|Vy`
    /// - `8XY2` - BitOp    - `Vx=Vx&Vy`
    /// - `8XY3` - BitOp    - `Vx=Vx^Vy`
    /// - `8XY4` - Math     - `Vx += Vy`            - `VF` is set to `1` when there's a carry, and to `0` when there isn't.
    /// - `8XY5` - Math     - `Vx -= Vy`            - `VF` is set to `0` when there's a borrow, and `1` when there isn't.
    /// - `8XY6` - BitOp    - `Vx=Vy=Vy>>1`         - Stores the least significant bit of `VY` in `VF`.
    /// - `8XY7` - Math     - `Vx=Vy-Vx`            - `VF` is set to `0` when there's a borrow, and `1` when there isn't.
    /// - `8XYE` - BitOp    - `Vx=Vy=Vy<<1`         - Stores whether bit `0x8` of `VY` is set in `VF`.
    fn alu(&mut self, op: AluOp, x: usize, y: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `9XY0` - Cond     - `if(Vx!=Vy)`          - Skips the next instruction if `VX` doesn't equal `VY`.
    fn skip_registers_not_equal(
        &self,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// - `ANNN` - MEM      - `I = NNN`             - Sets `I` to the address `NNN`.
    fn set_index(&mut self, nnn: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `BNNN` - Flow     - `PC=V0+NNN`           - Jumps to the address `NNN` plus `V0`.
    fn jump_offset(&self, nnn: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `CXNN` - Rand     - `Vx=rand()&NN`        - Sets `VX` to a random byte masked with `NN`.
    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `DXYN` - Disp     - `draw(Vx,Vy,N)`       - Draws a sprite at coordinate `(VX, VY)` that has a width of `8` pixels and a height of `N` pixels. Each row of `8` pixels is read as bit-coded starting from memory location `I`; `I` value doesn’t change after the execution of this instruction. `VF` is set to `1` if any screen pixels are flipped from set to unset when the sprite is drawn, and to `0` if that doesn’t happen
    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `EX9E` - KeyOp    - `if(key()==Vx)`       - Skips the next instruction if the key stored in `VX` is pressed.
    /// - `EXA1` - KeyOp    - `if(key()!=Vx)`       - Skips the next instruction if the key stored in `VX` isn't pressed.
    fn key(&self, op: KeyOp, x: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `FX07` - Timer    - `Vx = get_delay()`    - Sets `VX` to the value of the delay timer.
    /// - `FX0A` - KeyOp    - `Vx = get_key()`      - A key press is awaited, and then stored in `VX`.
    /// - `FX15` - Timer    - `delay_timer(Vx)`     - Sets the delay timer to `VX`.
    /// - `FX18` - Sound    - `sound_timer(Vx)`     - Sets the sound timer to `VX`.
    /// - `FX1E` - MEM      - `I +=Vx`              - Adds `VX` to `I`, `VF` flags a 16 bit overflow.
    /// - `FX29` - MEM      - `I=sprite_addr[Vx]`   - Sets `I` to the location of the font glyph for `VX`.
    /// - `FX33` - BCD      - `set_BCD(Vx)`         - Stores the decimal digits of `VX` at `I`, `I+1` and `I+2`.
    /// - `FX55` - MEM      - `reg_dump(Vx,&I)`     - Stores `V0` to `VX` in memory starting at `I`, `I` itself is left unmodified.
    /// - `FX65` - MEM      - `reg_load(Vx,&I)`     - Fills `V0` to `VX` from memory starting at `I`, `I` itself is left unmodified.
    fn misc(&mut self, op: MiscOp, x: usize)
        -> Result<(ProgramCounterStep, Operation), ProcessError>;
}
