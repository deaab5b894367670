use crate::{
    definitions::{cpu, display},
    opcode::{AluOp, ChipOpcodes, KeyOp, MiscOp, Operation, ProgramCounterStep, System},
    timer::TimerCallback,
    ProcessError,
};

use super::{ChipSet, State};

const FLAG: usize = cpu::register::LAST;

impl<S: TimerCallback> ChipOpcodes for ChipSet<S> {
    fn system(&mut self, op: System) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        match op {
            System::Clear => {
                // 00E0
                // clear display
                self.display.clear();
                Ok((ProgramCounterStep::Next, Operation::Draw))
            }
            System::Return => {
                // 00EE
                // Return from sub routine => pop from stack
                let pc = self.pop_stack()?;
                log::debug!("return to {:#X}", pc);
                Ok((ProgramCounterStep::Jump(pc), Operation::None))
            }
        }
    }

    fn jump(&self, nnn: usize) -> Result<ProgramCounterStep, ProcessError> {
        // 1NNN
        Ok(ProgramCounterStep::Jump(nnn))
    }

    fn call(&mut self, nnn: usize) -> Result<ProgramCounterStep, ProcessError> {
        // 2NNN
        // the counter already points past the call, which is where the return lands
        self.push_stack(self.program_counter)?;
        log::debug!("call {:#X}, depth {}", nnn, self.stack.len());
        Ok(ProgramCounterStep::Jump(nnn))
    }

    fn skip_equal(&self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 3XNN
        Ok(ProgramCounterStep::cond(self.registers[x] == nn))
    }

    fn skip_not_equal(&self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 4XNN
        Ok(ProgramCounterStep::cond(self.registers[x] != nn))
    }

    fn skip_registers_equal(
        &self,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError> {
        // 5XY0
        Ok(ProgramCounterStep::cond(
            self.registers[x] == self.registers[y],
        ))
    }

    fn load(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 6XNN
        self.registers[x] = nn;
        Ok(ProgramCounterStep::Next)
    }

    fn add_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 7XNN
        // let VX overflow, but ignore carry
        self.registers[x] = self.registers[x].wrapping_add(nn);
        Ok(ProgramCounterStep::Next)
    }

    fn alu(&mut self, op: AluOp, x: usize, y: usize) -> Result<ProgramCounterStep, ProcessError> {
        // The flag is always written before the result is computed, so with
        // `X` or `Y` being `F` the result sees the new flag.
        match op {
            AluOp::Assign => {
                // 8XY0
                self.registers[x] = self.registers[y];
            }
            AluOp::Or => {
                // 8XY1
                self.registers[x] |= self.registers[y];
            }
            AluOp::And => {
                // 8XY2
                self.registers[x] &= self.registers[y];
            }
            AluOp::Xor => {
                // 8XY3
                self.registers[x] ^= self.registers[y];
            }
            AluOp::Add => {
                // 8XY4
                let (_, carry) = self.registers[x].overflowing_add(self.registers[y]);
                self.registers[FLAG] = carry as u8;
                self.registers[x] = self.registers[x].wrapping_add(self.registers[y]);
            }
            AluOp::Sub => {
                // 8XY5
                // VF is the "no borrow" flag
                self.registers[FLAG] = (self.registers[x] >= self.registers[y]) as u8;
                self.registers[x] = self.registers[x].wrapping_sub(self.registers[y]);
            }
            AluOp::ShiftRight => {
                // 8XY6
                self.registers[FLAG] = self.registers[y] & 0x1;
                let res = self.registers[y] >> 1;
                self.registers[y] = res;
                self.registers[x] = res;
            }
            AluOp::SubReverse => {
                // 8XY7
                self.registers[FLAG] = (self.registers[y] >= self.registers[x]) as u8;
                self.registers[x] = self.registers[y].wrapping_sub(self.registers[x]);
            }
            AluOp::ShiftLeft => {
                // 8XYE
                // the flag tests bit 0x8, not the bit that is shifted out
                self.registers[FLAG] = (self.registers[y] & 0x8 != 0) as u8;
                let res = self.registers[y] << 1;
                self.registers[y] = res;
                self.registers[x] = res;
            }
        }
        Ok(ProgramCounterStep::Next)
    }

    fn skip_registers_not_equal(
        &self,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError> {
        // 9XY0
        Ok(ProgramCounterStep::cond(
            self.registers[x] != self.registers[y],
        ))
    }

    fn set_index(&mut self, nnn: usize) -> Result<ProgramCounterStep, ProcessError> {
        // ANNN
        self.index_register = nnn as u16;
        Ok(ProgramCounterStep::Next)
    }

    fn jump_offset(&self, nnn: usize) -> Result<ProgramCounterStep, ProcessError> {
        // BNNN
        let v0 = self.registers[0] as usize;
        Ok(ProgramCounterStep::Jump(v0 + nnn))
    }

    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // CXNN
        // using a fill bytes call here, as the trait RngCore does not
        // support random u8.
        let mut rand: [u8; 1] = [0];
        self.rng.fill_bytes(&mut rand);
        self.registers[x] = nn & rand[0];
        Ok(ProgramCounterStep::Next)
    }

    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        // DXYN
        // see https://tobiasvl.github.io/blog/write-a-chip-8-emulator/
        let coorx = self.registers[x] as usize;
        let coory = self.registers[y] as usize;

        let sprite = self.memory_range(self.index_register as usize, n)?;

        let mut collision = false;
        for (i, row) in self.memory[sprite].iter().enumerate() {
            // the most significant bit is the leftmost pixel
            for j in 0..display::SPRITE_WIDTH {
                if row & (0x80 >> j) == 0 {
                    continue;
                }
                // the framebuffer wraps both coordinates around
                collision |= self.display.flip(coorx + j, coory + i);
            }
        }

        self.registers[FLAG] = collision as u8;
        self.display.mark_dirty();

        Ok((ProgramCounterStep::Next, Operation::Draw))
    }

    fn key(&self, op: KeyOp, x: usize) -> Result<ProgramCounterStep, ProcessError> {
        let key = self.registers[x];
        let pressed = self
            .keyboard
            .is_pressed(key as usize)
            .ok_or(ProcessError::InvalidKey(key))?;
        let step = match op {
            // EX9E
            KeyOp::Pressed => ProgramCounterStep::cond(pressed),
            // EXA1
            KeyOp::NotPressed => ProgramCounterStep::cond(!pressed),
        };
        Ok(step)
    }

    fn misc(
        &mut self,
        op: MiscOp,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let mut operation = Operation::None;
        match op {
            MiscOp::GetDelayTimer => {
                // FX07
                self.registers[x] = self.get_delay_timer();
            }
            MiscOp::AwaitKeyPress => {
                // FX0A
                // Blocking Operation. All instruction halted until next key event, the
                // counter already points to the instruction to continue with.
                log::debug!("waiting for key");
                self.state = State::WaitKey { register: x };
                operation = Operation::Wait;
            }
            MiscOp::SetDelayTimer => {
                // FX15
                self.delay_timer.set_value(self.registers[x]);
            }
            MiscOp::SetSoundTimer => {
                // FX18
                self.sound_timer.set_value(self.registers[x]);
            }
            MiscOp::AddToIndex => {
                // FX1E
                let (_, overflow) = self
                    .index_register
                    .overflowing_add(self.registers[x] as u16);
                self.registers[FLAG] = overflow as u8;
                self.index_register = self
                    .index_register
                    .wrapping_add(self.registers[x] as u16);
            }
            MiscOp::FontGlyph => {
                // FX29
                let glyph = self.registers[x] as usize * display::fontset::GLYPH_SIZE;
                self.index_register = (display::fontset::LOCATION + glyph) as u16;
            }
            MiscOp::StoreBcd => {
                // FX33
                let range = self.memory_range(self.index_register as usize, 3)?;
                let r = self.registers[x];

                // 246u8 / 100 => 2, 246u8 / 10 => 24 % 10 => 4, 246u8 % 10 => 6
                self.memory[range].copy_from_slice(&[r / 100, r / 10 % 10, r % 10]);
            }
            MiscOp::StoreRegisters => {
                // FX55
                let range = self.memory_range(self.index_register as usize, x + 1)?;
                self.memory[range].copy_from_slice(&self.registers[..=x]);
            }
            MiscOp::LoadRegisters => {
                // FX65
                let range = self.memory_range(self.index_register as usize, x + 1)?;
                self.registers[..=x].copy_from_slice(&self.memory[range]);
            }
        }
        Ok((ProgramCounterStep::Next, operation))
    }
}
