//! The CHIP-8 emulator as described at https://en.wikipedia.org/wiki/CHIP-8#Virtual_machine_description.

use crate::emulator::config::Quirks;
use crate::emulator::fault::Fault;
use crate::emulator::input::{DummyInput, EmulatorInput};
use crate::emulator::instruction::*;
use crate::emulator::memory::{Memory, FONT_GLYPH_SIZE, MEM_SIZE, PROGRAM_START};
use crate::emulator::output::{Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::util::bit_splitter::byte_to_bits;

const NUM_REGISTERS: usize = 16;
const PC_START: u16 = PROGRAM_START as u16;
const FLAG: usize = 0xF;

/// The interpreter state: memory, registers, stack, timers and screen.
///
/// Nothing here looks at the clock. Something else decides when to call
/// [`Emulator::step`] and [`Emulator::tick_timers`], see the scheduler.
pub struct Emulator<I: EmulatorInput> {
    memory: Memory,
    registers: [u8; NUM_REGISTERS],
    delay_timer: u8,
    sound_timer: u8,
    i: u16,
    program_counter: u16,
    stack: Vec<u16>,
    framebuffer: Framebuffer,
    quirks: Quirks,
    input: I,

    // Cleared by instructions that set the program counter themselves
    advance_pc: bool,
    redraw: bool,
    last_fault: Option<Fault>,
}

impl Emulator<DummyInput> {
    /// Create a new emulator without input and with the default quirks
    pub fn new() -> Emulator<DummyInput> {
        Emulator::with_input(DummyInput, Quirks::default())
    }
}

impl Default for Emulator<DummyInput> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: EmulatorInput> Emulator<I> {
    /// Create a new emulator reading keys from `input`.
    pub fn with_input(input: I, quirks: Quirks) -> Emulator<I> {
        Emulator {
            memory: Memory::new(),
            registers: [0; NUM_REGISTERS],
            delay_timer: 0,
            sound_timer: 0,
            i: 0,
            program_counter: PC_START,
            stack: Vec::new(),
            framebuffer: Framebuffer::new(),
            quirks,
            input,

            advance_pc: true,
            redraw: true,
            last_fault: None,
        }
    }

    /// Put everything except the quirks back to its power-on state.
    /// Memory is zeroed apart from the font, so the program must be loaded again.
    pub fn reset(&mut self) {
        log::info!("Resetting emulator");
        self.memory = Memory::new();
        self.registers = [0; NUM_REGISTERS];
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.i = 0;
        self.program_counter = PC_START;
        self.stack.clear();
        self.framebuffer.clear();
        self.advance_pc = true;
        self.redraw = true;
        self.last_fault = None;
    }

    /// Copy a program into memory at 0x200.
    /// A program that does not fit is rejected as a whole.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Fault> {
        let result = self.memory.copy_from(PROGRAM_START, program).map_err(|_| Fault::RomTooLarge {
            size: program.len(),
            max: MEM_SIZE - PROGRAM_START,
        });
        match result {
            Ok(()) => log::info!("Loaded {} bytes at {:#05x}", program.len(), PROGRAM_START),
            Err(fault) => self.report(fault),
        }
        result
    }

    /// Fetch the instruction at the program counter and execute it.
    pub fn step(&mut self) -> Result<(), Fault> {
        let pc = self.program_counter;
        let opcode = match self.memory.read_word(pc as usize) {
            Ok(opcode) => opcode,
            Err(_) => return self.skip_cycle(Fault::ProgramCounterOutOfBounds { pc }),
        };

        match Instruction::from_u16(opcode) {
            Some(instruction) => {
                log::trace!("{:#05x}: {:04X}  {}", pc, opcode, instruction);
                self.execute_single(instruction)
            }
            None => self.skip_cycle(Fault::UnknownOpcode { opcode, pc }),
        }
    }

    /// Execute `count` instructions in a row.
    pub fn run_batch(&mut self, count: usize) {
        for _ in 0..count {
            // Faults are logged and kept in `last_fault`, execution goes on
            let _ = self.step();
        }
    }

    /// Decrement the delay and sound timers, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Execute a single instruction, then move on to the next one
    /// unless the instruction set the program counter itself.
    pub fn execute_single(&mut self, instruction: Instruction) -> Result<(), Fault> {
        self.advance_pc = true;
        let result = self.execute(instruction);
        if self.advance_pc {
            self.program_counter = self.program_counter.wrapping_add(2);
        }
        if let Err(fault) = result {
            self.report(fault);
        }
        result
    }

    /// Execute instructions in order. Returns the first fault, if any,
    /// but keeps executing the rest.
    pub fn execute_many(&mut self, instructions: &[Instruction]) -> Result<(), Fault> {
        instructions
            .iter()
            .fold(Ok(()), |result, instruction| result.and(self.execute_single(*instruction)))
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    pub fn register(&self, x: u8) -> u8 {
        self.registers[x as usize & 0xF]
    }

    /// The index register I.
    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Whether the buzzer should sound.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    /// The most recent fault since the last reset.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    /// Whether the framebuffer changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw, false)
    }

    fn report(&mut self, fault: Fault) {
        log::warn!("{}", fault);
        self.last_fault = Some(fault);
    }

    /// A cycle that could not execute anything still moves on.
    fn skip_cycle(&mut self, fault: Fault) -> Result<(), Fault> {
        self.program_counter = self.program_counter.wrapping_add(2);
        self.report(fault);
        Err(fault)
    }

    fn skip_next_if(&mut self, condition: bool) {
        if condition {
            log::debug!("Skipping instruction at {:#05x}", self.program_counter.wrapping_add(2));
            self.program_counter = self.program_counter.wrapping_add(2);
        }
    }

    fn jump(&mut self, addr: u16) {
        self.program_counter = addr;
        self.advance_pc = false;
    }

    /// Address of the `offset`th byte moved by FX55 and FX65.
    fn transfer_address(&mut self, offset: usize) -> usize {
        if self.quirks.store_increment_ir {
            self.i = self.i.wrapping_add(1);
            self.i as usize
        } else {
            self.i as usize + offset
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), Fault> {
        match instruction {

            // Clear the screen
            Instruction::ClearScreen => {
                self.framebuffer.clear();
                self.redraw = true;
            }

            // Return to the previous call site via the stack.
            Instruction::Return => match self.stack.pop() {
                Some(addr) => {
                    log::debug!("Returning to {:#05x}", addr);
                    self.jump(addr);
                }
                None => {
                    return Err(Fault::StackUnderflow {
                        pc: self.program_counter,
                    })
                }
            },

            Instruction::Goto(Addr(addr)) => self.jump(addr),

            // Store the return address on the stack, then jump to the specified address
            Instruction::Call(Addr(addr)) => {
                let return_addr = self.program_counter.wrapping_add(2);
                log::debug!("Calling {:#05x}, returning to {:#05x}", addr, return_addr);
                self.stack.push(return_addr);
                self.jump(addr);
            }

            Instruction::IfRegEqConst(Reg(x), Const(n)) => {
                self.skip_next_if(self.registers[x as usize] == n);
            }

            Instruction::IfRegNeqConst(Reg(x), Const(n)) => {
                self.skip_next_if(self.registers[x as usize] != n);
            }

            Instruction::IfRegEqReg(Reg(x), Reg(y)) => {
                self.skip_next_if(self.registers[x as usize] == self.registers[y as usize]);
            }

            Instruction::IfRegNeqReg(Reg(x), Reg(y)) => {
                self.skip_next_if(self.registers[x as usize] != self.registers[y as usize]);
            }

            Instruction::SetRegToConst(Reg(x), Const(n)) => {
                self.registers[x as usize] = n;
            }

            // VF is left alone
            Instruction::IncRegByConst(Reg(x), Const(n)) => {
                self.registers[x as usize] = self.registers[x as usize].wrapping_add(n);
            }

            Instruction::SetRegToReg(Reg(x), Reg(y)) => {
                self.registers[x as usize] = self.registers[y as usize];
            }

            Instruction::BitwiseOr(Reg(x), Reg(y)) => {
                self.registers[x as usize] |= self.registers[y as usize];
            }

            Instruction::BitwiseAnd(Reg(x), Reg(y)) => {
                self.registers[x as usize] &= self.registers[y as usize];
            }

            Instruction::BitwiseXor(Reg(x), Reg(y)) => {
                self.registers[x as usize] ^= self.registers[y as usize];
            }

            // VF is 1 on carry
            Instruction::IncRegByReg(Reg(x), Reg(y)) => {
                let (sum, carry) = self.registers[x as usize].overflowing_add(self.registers[y as usize]);
                self.registers[x as usize] = sum;
                self.registers[FLAG] = carry as u8;
            }

            // VF is 0 on borrow
            Instruction::DecRegByReg(Reg(x), Reg(y)) => {
                let (vx, vy) = (self.registers[x as usize], self.registers[y as usize]);
                self.registers[x as usize] = vx.wrapping_sub(vy);
                self.registers[FLAG] = (vx >= vy) as u8;
            }

            Instruction::SetVxVyMinusVx(Reg(x), Reg(y)) => {
                let (vx, vy) = (self.registers[x as usize], self.registers[y as usize]);
                self.registers[x as usize] = vy.wrapping_sub(vx);
                self.registers[FLAG] = (vy >= vx) as u8;
            }

            // VF gets the bit shifted out
            Instruction::BitshiftRight(Reg(x), Reg(y)) => {
                if self.quirks.shift_vx_is_vy {
                    self.registers[x as usize] = self.registers[y as usize];
                }
                let value = self.registers[x as usize];
                self.registers[x as usize] = value >> 1;
                self.registers[FLAG] = value & 0x01;
            }

            Instruction::BitshiftLeft(Reg(x), Reg(y)) => {
                if self.quirks.shift_vx_is_vy {
                    self.registers[x as usize] = self.registers[y as usize];
                }
                let value = self.registers[x as usize];
                self.registers[x as usize] = value << 1;
                self.registers[FLAG] = value >> 7;
            }

            Instruction::SetI(Addr(addr)) => {
                self.i = addr;
            }

            Instruction::JumpWithOffset(Reg(x), Addr(addr)) => {
                let offset = if self.quirks.jump_with_offset_legacy {
                    self.registers[0]
                } else {
                    self.registers[x as usize]
                };
                self.jump(addr + offset as u16);
            }

            Instruction::SetVxRand(Reg(x), Const(n)) => {
                self.registers[x as usize] = rand::random::<u8>() & n;
            }

            Instruction::Draw(Reg(x), Reg(y), Const(sprite_height)) => {
                return self.draw(x as usize, y as usize, sprite_height as usize);
            }

            Instruction::IfKeyEqVx(Reg(x)) => {
                self.skip_next_if(self.input.is_pressed(self.registers[x as usize]));
            }

            Instruction::IfKeyNeqVx(Reg(x)) => {
                self.skip_next_if(!self.input.is_pressed(self.registers[x as usize]));
            }

            Instruction::SetRegToDelayTimer(Reg(x)) => {
                self.registers[x as usize] = self.delay_timer;
            }

            // Poll for a key, and come back to this instruction until there is one
            Instruction::SetRegToGetKey(Reg(x)) => match self.input.first_pressed() {
                Some(key) => {
                    log::debug!("Got key {:#x}", key);
                    self.registers[x as usize] = key;
                }
                None => self.advance_pc = false,
            },

            Instruction::SetDelayTimerToReg(Reg(x)) => {
                self.delay_timer = self.registers[x as usize];
                log::debug!("Delay timer set to {}", self.delay_timer);
            }

            Instruction::SetSoundTimerToReg(Reg(x)) => {
                self.sound_timer = self.registers[x as usize];
                log::debug!("Sound timer set to {}", self.sound_timer);
            }

            // Wraps around past the end of memory, with VF set to 1
            Instruction::AddRegToI(Reg(x)) => {
                let sum = self.i as usize + self.registers[x as usize] as usize;
                if sum >= MEM_SIZE {
                    self.i = (sum % MEM_SIZE) as u16;
                    self.registers[FLAG] = 1;
                } else {
                    self.i = sum as u16;
                }
            }

            // Set i to character address. Each font element is 5 bytes wide.
            Instruction::SetIToSpriteAddrVx(Reg(x)) => {
                let digit = (self.registers[x as usize] & 0x0F) as u16;
                self.i = digit * FONT_GLYPH_SIZE as u16;
            }

            // Decimal digits without leading zeros, most significant first
            Instruction::SetIToBcdOfReg(Reg(x)) => {
                let value = self.registers[x as usize];
                let digits = match value {
                    0..=9 => vec![value],
                    10..=99 => vec![value / 10, value % 10],
                    _ => vec![value / 100, value / 10 % 10, value % 10],
                };
                self.memory.copy_from(self.i as usize, &digits)?;
            }

            // Dump register values up to Vx
            Instruction::RegDump(Reg(x)) => {
                let mut result = Ok(());
                for reg_no in 0..=x as usize {
                    let address = self.transfer_address(reg_no);
                    result = result.and(self.memory.write(address, self.registers[reg_no]));
                }
                return result;
            }

            // Load register values up to Vx
            Instruction::RegLoad(Reg(x)) => {
                let mut result = Ok(());
                for reg_no in 0..=x as usize {
                    let address = self.transfer_address(reg_no);
                    match self.memory.read(address) {
                        Ok(value) => self.registers[reg_no] = value,
                        Err(fault) => result = result.and(Err(fault)),
                    }
                }
                return result;
            }
        };

        Ok(())
    }

    /// XOR a sprite of `sprite_height` rows starting at I onto the screen at (Vx, Vy).
    /// VF is set to 1 if any pixel was turned off.
    fn draw(&mut self, x: usize, y: usize, sprite_height: usize) -> Result<(), Fault> {
        let x_coord = self.registers[x] as usize % SCREEN_WIDTH;
        let y_coord = self.registers[y] as usize % SCREEN_HEIGHT;
        self.registers[FLAG] = 0;
        self.redraw = true;

        for row in 0..sprite_height {
            let sprite_row = self.memory.read(self.i as usize + row)?;
            for (col, bit) in byte_to_bits(sprite_row).iter().enumerate() {
                let (mut px, mut py) = (x_coord + col, y_coord + row);
                if self.quirks.draw_sprite_wrap {
                    px %= SCREEN_WIDTH;
                    py %= SCREEN_HEIGHT;
                } else if px >= SCREEN_WIDTH || py >= SCREEN_HEIGHT {
                    break; // Clip the rest of the row
                }

                if *bit == 1 && self.framebuffer.flip(px, py) {
                    self.registers[FLAG] = 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::emulator::input::Keypad;
    use proptest::prelude::*;
    use test_case::test_case;

    fn with_quirks(quirks: Quirks) -> Emulator<DummyInput> {
        Emulator::with_input(DummyInput, quirks)
    }

    fn run(program: &[u8], steps: usize) -> Emulator<DummyInput> {
        let mut emulator = Emulator::new();
        emulator.load(program).unwrap();
        for _ in 0..steps {
            let _ = emulator.step();
        }
        emulator
    }

    #[test]
    fn goto_goes_to() {
        let mut emulator = Emulator::new();
        emulator.execute_single(Instruction::Goto(Addr(0x250))).unwrap();
        assert_eq!(emulator.program_counter, 0x250);
    }

    #[test]
    fn add_program_runs() {
        let emulator = run(&[0x60, 0x0A, 0x61, 0x0B, 0x80, 0x14], 3);
        assert_eq!(emulator.registers[0], 21);
        assert_eq!(emulator.registers[FLAG], 0);
        assert_eq!(emulator.program_counter, 0x206);
    }

    #[test]
    fn return_after_call_is_neutral() {
        let mut emulator = Emulator::new();
        assert_eq!(emulator.program_counter, 0x200);

        let program = [
            0x22, 0x04, // 0x200, call 0x204
            0x00, 0x00, // 0x202
            0x00, 0xEE, // 0x204, return
        ];
        emulator.load(&program).unwrap();

        emulator.step().unwrap(); // Call 0x204
        assert_eq!(emulator.program_counter, 0x204);
        assert_eq!(emulator.stack(), &[0x202]);
        emulator.step().unwrap(); // Return to 0x202
        assert_eq!(emulator.program_counter, 0x202);
        assert!(emulator.stack().is_empty());
    }

    #[test]
    fn return_with_empty_stack_is_reported_and_skipped() {
        let mut emulator = run(&[0x00, 0xEE], 0);
        let fault = Fault::StackUnderflow { pc: 0x200 };
        assert_eq!(emulator.step(), Err(fault));
        assert_eq!(emulator.program_counter, 0x202);
        assert!(emulator.stack().is_empty());
        assert_eq!(emulator.last_fault(), Some(fault));
    }

    #[test]
    fn call_depth_is_not_capped() {
        let mut emulator = Emulator::new();
        for _ in 0..100 {
            emulator.execute_single(Instruction::Call(Addr(0x200))).unwrap();
        }
        assert_eq!(emulator.stack().len(), 100);
    }

    #[test]
    fn unknown_opcode_is_a_no_op() {
        let mut emulator = run(&[0xFF, 0xFF, 0x60, 0x01], 0);
        assert_eq!(emulator.step(), Err(Fault::UnknownOpcode { opcode: 0xFFFF, pc: 0x200 }));
        assert_eq!(emulator.program_counter, 0x202);
        emulator.step().unwrap();
        assert_eq!(emulator.registers[0], 1);
    }

    #[test]
    fn fetch_past_the_end_is_a_no_op() {
        let mut emulator = Emulator::new();
        emulator.execute_single(Instruction::Goto(Addr(0xFFF))).unwrap();
        assert_eq!(emulator.step(), Err(Fault::ProgramCounterOutOfBounds { pc: 0xFFF }));
        assert_eq!(emulator.program_counter, 0x1001);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut emulator = Emulator::new();
        let program = vec![0x12; MEM_SIZE - PROGRAM_START + 1];
        assert_eq!(
            emulator.load(&program),
            Err(Fault::RomTooLarge { size: 3585, max: 3584 })
        );
        assert!(emulator.memory()[PROGRAM_START..].iter().all(|b| *b == 0));
    }

    #[test_case(0x3, 5, 5 => 0x204 ; "skip eq const taken")]
    #[test_case(0x3, 5, 6 => 0x202 ; "skip eq const not taken")]
    #[test_case(0x4, 5, 6 => 0x204 ; "skip neq const taken")]
    #[test_case(0x4, 5, 5 => 0x202 ; "skip neq const not taken")]
    fn skip_on_const(kind: u8, register: u8, constant: u8) -> u16 {
        let mut emulator = Emulator::new();
        emulator.registers[2] = register;
        let instruction = match kind {
            0x3 => Instruction::IfRegEqConst(Reg(2), Const(constant)),
            _ => Instruction::IfRegNeqConst(Reg(2), Const(constant)),
        };
        emulator.execute_single(instruction).unwrap();
        emulator.program_counter
    }

    #[test]
    fn skip_on_registers() {
        let mut emulator = Emulator::new();
        emulator.registers[1] = 7;
        emulator.registers[2] = 7;
        emulator.execute_single(Instruction::IfRegEqReg(Reg(1), Reg(2))).unwrap();
        assert_eq!(emulator.program_counter, 0x204);
        emulator.execute_single(Instruction::IfRegNeqReg(Reg(1), Reg(2))).unwrap();
        assert_eq!(emulator.program_counter, 0x206);
    }

    #[test]
    fn bitwise_operations() {
        let mut emulator = Emulator::new();
        emulator.registers[FLAG] = 9;
        emulator.registers[0] = 0b1100;
        emulator.registers[1] = 0b1010;
        emulator.execute_single(Instruction::BitwiseOr(Reg(0), Reg(1))).unwrap();
        assert_eq!(emulator.registers[0], 0b1110);
        emulator.execute_single(Instruction::BitwiseAnd(Reg(0), Reg(1))).unwrap();
        assert_eq!(emulator.registers[0], 0b1010);
        emulator.execute_single(Instruction::BitwiseXor(Reg(0), Reg(1))).unwrap();
        assert_eq!(emulator.registers[0], 0);
        assert_eq!(emulator.registers[FLAG], 9);
    }

    #[test_case(200, 100 => (44, 1) ; "carry")]
    #[test_case(100, 100 => (200, 0) ; "no carry")]
    #[test_case(255, 1 => (0, 1) ; "carry to zero")]
    fn add_with_carry(vx: u8, vy: u8) -> (u8, u8) {
        let mut emulator = Emulator::new();
        emulator.registers[3] = vx;
        emulator.registers[4] = vy;
        emulator.execute_single(Instruction::IncRegByReg(Reg(3), Reg(4))).unwrap();
        (emulator.registers[3], emulator.registers[FLAG])
    }

    #[test_case(10, 3 => (7, 1) ; "no borrow")]
    #[test_case(3, 3 => (0, 1) ; "equal")]
    #[test_case(3, 10 => (249, 0) ; "borrow")]
    fn sub_with_borrow(vx: u8, vy: u8) -> (u8, u8) {
        let mut emulator = Emulator::new();
        emulator.registers[3] = vx;
        emulator.registers[4] = vy;
        emulator.execute_single(Instruction::DecRegByReg(Reg(3), Reg(4))).unwrap();
        (emulator.registers[3], emulator.registers[FLAG])
    }

    #[test_case(3, 10 => (7, 1) ; "no borrow")]
    #[test_case(10, 3 => (249, 0) ; "borrow")]
    fn reverse_sub_with_borrow(vx: u8, vy: u8) -> (u8, u8) {
        let mut emulator = Emulator::new();
        emulator.registers[3] = vx;
        emulator.registers[4] = vy;
        emulator.execute_single(Instruction::SetVxVyMinusVx(Reg(3), Reg(4))).unwrap();
        (emulator.registers[3], emulator.registers[FLAG])
    }

    #[test_case(false, 0b0000_0101 => (0b0000_0010, 1) ; "vx shifted")]
    #[test_case(true, 0b0000_0101 => (0b0000_0001, 0) ; "vy shifted")]
    fn shift_right(shift_vx_is_vy: bool, vx: u8) -> (u8, u8) {
        let mut emulator = with_quirks(Quirks { shift_vx_is_vy, ..Quirks::default() });
        emulator.registers[1] = vx;
        emulator.registers[2] = 0b0000_0010;
        emulator.execute_single(Instruction::BitshiftRight(Reg(1), Reg(2))).unwrap();
        (emulator.registers[1], emulator.registers[FLAG])
    }

    #[test_case(false, 0b1000_0001 => (0b0000_0010, 1) ; "vx shifted")]
    #[test_case(true, 0b1000_0001 => (0b1000_0000, 0) ; "vy shifted")]
    fn shift_left(shift_vx_is_vy: bool, vx: u8) -> (u8, u8) {
        let mut emulator = with_quirks(Quirks { shift_vx_is_vy, ..Quirks::default() });
        emulator.registers[1] = vx;
        emulator.registers[2] = 0b0100_0000;
        emulator.execute_single(Instruction::BitshiftLeft(Reg(1), Reg(2))).unwrap();
        (emulator.registers[1], emulator.registers[FLAG])
    }

    #[test_case(false => 0x334 ; "nnn plus vx")]
    #[test_case(true => 0x321 ; "nnn plus v0")]
    fn jump_with_offset(jump_with_offset_legacy: bool) -> u16 {
        let mut emulator = with_quirks(Quirks { jump_with_offset_legacy, ..Quirks::default() });
        emulator.registers[0] = 0x01;
        emulator.registers[3] = 0x14;
        emulator.execute_single(Instruction::JumpWithOffset(Reg(3), Addr(0x320))).unwrap();
        emulator.program_counter
    }

    #[test]
    fn random_with_zero_mask_is_zero() {
        let mut emulator = Emulator::new();
        for _ in 0..32 {
            emulator.registers[5] = 0xFF;
            emulator.execute_single(Instruction::SetVxRand(Reg(5), Const(0))).unwrap();
            assert_eq!(emulator.registers[5], 0);
        }
    }

    #[test]
    fn random_is_masked() {
        let mut emulator = Emulator::new();
        for _ in 0..32 {
            emulator.execute_single(Instruction::SetVxRand(Reg(5), Const(0x0F))).unwrap();
            assert_eq!(emulator.registers[5] & 0xF0, 0);
        }
    }

    #[test]
    fn timers() {
        let mut emulator = Emulator::new();
        emulator.registers[0] = 2;
        emulator.execute_single(Instruction::SetDelayTimerToReg(Reg(0))).unwrap();
        emulator.execute_single(Instruction::SetSoundTimerToReg(Reg(0))).unwrap();
        assert!(emulator.sound_active());
        emulator.tick_timers();
        emulator.execute_single(Instruction::SetRegToDelayTimer(Reg(1))).unwrap();
        assert_eq!(emulator.registers[1], 1);
        emulator.tick_timers();
        emulator.tick_timers();
        assert_eq!(emulator.delay_timer(), 0);
        assert_eq!(emulator.sound_timer(), 0);
        assert!(!emulator.sound_active());
    }

    #[test_case(0x100, 0x10 => (0x110, 0) ; "no overflow")]
    #[test_case(0xFFF, 0x01 => (0x000, 1) ; "wraps to zero")]
    #[test_case(0xFF0, 0x20 => (0x010, 1) ; "wraps past zero")]
    fn add_to_index(i: u16, vx: u8) -> (u16, u8) {
        let mut emulator = Emulator::new();
        emulator.i = i;
        emulator.registers[2] = vx;
        emulator.execute_single(Instruction::AddRegToI(Reg(2))).unwrap();
        (emulator.i, emulator.registers[FLAG])
    }

    #[test]
    fn font_address_uses_low_nibble() {
        let mut emulator = Emulator::new();
        emulator.registers[0] = 0x1A;
        emulator.execute_single(Instruction::SetIToSpriteAddrVx(Reg(0))).unwrap();
        assert_eq!(emulator.i, 50);
    }

    #[test_case(254 => vec![2, 5, 4] ; "three digits")]
    #[test_case(42 => vec![4, 2] ; "two digits")]
    #[test_case(7 => vec![7] ; "one digit")]
    fn decimal_digits(value: u8) -> Vec<u8> {
        let mut emulator = Emulator::new();
        emulator.i = 0x300;
        emulator.registers[6] = value;
        emulator.execute_single(Instruction::SetIToBcdOfReg(Reg(6))).unwrap();
        let len = value.to_string().len();
        emulator.memory()[0x300..0x300 + len].to_vec()
    }

    #[test]
    fn decimal_digits_past_the_end_are_rejected() {
        let mut emulator = Emulator::new();
        emulator.i = 0xFFE;
        emulator.registers[6] = 123;
        assert!(emulator.execute_single(Instruction::SetIToBcdOfReg(Reg(6))).is_err());
        assert_eq!(emulator.memory()[0xFFE..], [0, 0]);
        assert_eq!(emulator.program_counter, 0x202);
    }

    #[test]
    fn dump_and_load_registers() {
        let mut emulator = Emulator::new();
        emulator.i = 0x300;
        emulator.registers[..3].copy_from_slice(&[1, 2, 3]);
        emulator.execute_single(Instruction::RegDump(Reg(2))).unwrap();
        assert_eq!(emulator.memory()[0x300..0x304], [1, 2, 3, 0]);
        assert_eq!(emulator.i, 0x300);

        emulator.registers = [0; NUM_REGISTERS];
        emulator.execute_single(Instruction::RegLoad(Reg(1))).unwrap();
        assert_eq!(emulator.registers[..3], [1, 2, 0]);
    }

    #[test]
    fn dump_with_incrementing_index() {
        let mut emulator = with_quirks(Quirks { store_increment_ir: true, ..Quirks::default() });
        emulator.i = 0x300;
        emulator.registers[..3].copy_from_slice(&[1, 2, 3]);
        emulator.execute_single(Instruction::RegDump(Reg(2))).unwrap();
        assert_eq!(emulator.memory()[0x300..0x304], [0, 1, 2, 3]);
        assert_eq!(emulator.i, 0x303);
    }

    #[test]
    fn dump_past_the_end_writes_what_fits() {
        let mut emulator = Emulator::new();
        emulator.i = 0xFFE;
        emulator.registers[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(
            emulator.execute_single(Instruction::RegDump(Reg(3))),
            Err(Fault::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(emulator.memory()[0xFFE..], [1, 2]);
    }

    #[test]
    fn load_past_the_end_reads_what_fits() {
        let mut emulator = Emulator::new();
        emulator.memory.copy_from(0xFFE, &[7, 8]).unwrap();
        emulator.i = 0xFFE;
        emulator.registers[..4].copy_from_slice(&[9, 9, 9, 9]);
        let result = emulator.execute_single(Instruction::RegLoad(Reg(3)));
        assert_eq!(result, Err(Fault::MemoryOutOfBounds { address: 0x1000 }));
        assert_eq!(emulator.registers[..4], [7, 8, 9, 9]);
        assert_eq!(emulator.last_fault(), Some(Fault::MemoryOutOfBounds { address: 0x1000 }));
        assert_eq!(emulator.program_counter, 0x202);
    }

    #[test]
    fn clear_screen_clears_screen() {
        let mut emulator = Emulator::new();
        emulator.framebuffer.set(0, 0, 1);
        emulator.framebuffer.set(40, 20, 1);
        emulator.execute_single(Instruction::ClearScreen).unwrap();
        assert_eq!(emulator.framebuffer.lit(), 0);
        assert!(emulator.take_redraw());
        assert!(!emulator.take_redraw());
    }

    #[test]
    fn draw_font_glyph() {
        let mut emulator = Emulator::new();
        emulator.registers[0] = 0; // Glyph "0" at address 0
        emulator.registers[1] = 2;
        emulator.registers[2] = 3;
        emulator.execute_many(&[
            Instruction::SetIToSpriteAddrVx(Reg(0)),
            Instruction::Draw(Reg(1), Reg(2), Const(5)),
        ])
        .unwrap();

        let frame = emulator.framebuffer();
        let row = |y: usize| (2..6).map(|x| frame.get(x, y)).collect::<Vec<_>>();
        assert_eq!(row(3), vec![1, 1, 1, 1]);
        assert_eq!(row(4), vec![1, 0, 0, 1]);
        assert_eq!(row(7), vec![1, 1, 1, 1]);
        assert_eq!(frame.lit(), 14);
        assert_eq!(emulator.registers[FLAG], 0);
    }

    #[test]
    fn draw_twice_collides_and_erases() {
        let mut emulator = Emulator::new();
        emulator.execute_single(Instruction::Draw(Reg(0), Reg(0), Const(5))).unwrap();
        assert_eq!(emulator.registers[FLAG], 0);
        emulator.execute_single(Instruction::Draw(Reg(0), Reg(0), Const(5))).unwrap();
        assert_eq!(emulator.registers[FLAG], 1);
        assert_eq!(emulator.framebuffer().lit(), 0);
    }

    #[test]
    fn draw_origin_wraps() {
        let mut emulator = with_quirks(Quirks { draw_sprite_wrap: false, ..Quirks::default() });
        emulator.registers[0] = 64 + 1;
        emulator.registers[1] = 32 + 2;
        emulator.memory.write(0x300, 0x80).unwrap();
        emulator.i = 0x300;
        emulator.execute_single(Instruction::Draw(Reg(0), Reg(1), Const(1))).unwrap();
        assert_eq!(emulator.framebuffer().get(1, 2), 1);
    }

    #[test_case(true => (3, 2) ; "wrapped")]
    #[test_case(false => (1, 0) ; "clipped")]
    fn draw_at_edge(draw_sprite_wrap: bool) -> (usize, u8) {
        let mut emulator = with_quirks(Quirks { draw_sprite_wrap, ..Quirks::default() });
        emulator.memory.copy_from(0x300, &[0b1100_0000, 0b1000_0000]).unwrap();
        emulator.i = 0x300;
        emulator.registers[0] = 63;
        emulator.registers[1] = 31;
        emulator.execute_single(Instruction::Draw(Reg(0), Reg(1), Const(2))).unwrap();
        let frame = emulator.framebuffer();
        (frame.lit(), frame.get(0, 31) + frame.get(63, 0))
    }

    #[test]
    fn sprite_rows_past_the_end_are_not_drawn() {
        let mut emulator = Emulator::new();
        emulator.i = 0xFFF;
        assert_eq!(
            emulator.execute_single(Instruction::Draw(Reg(0), Reg(0), Const(3))),
            Err(Fault::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(emulator.program_counter, 0x202);
    }

    #[test]
    fn skip_on_key() {
        let mut emulator = Emulator::with_input(Keypad::new(), Quirks::default());
        emulator.registers[0] = 0xA;
        emulator.execute_single(Instruction::IfKeyEqVx(Reg(0))).unwrap();
        assert_eq!(emulator.program_counter, 0x202);
        emulator.execute_single(Instruction::IfKeyNeqVx(Reg(0))).unwrap();
        assert_eq!(emulator.program_counter, 0x206);

        emulator.input().press(0xA);
        emulator.execute_single(Instruction::IfKeyEqVx(Reg(0))).unwrap();
        assert_eq!(emulator.program_counter, 0x20A);
        emulator.execute_single(Instruction::IfKeyNeqVx(Reg(0))).unwrap();
        assert_eq!(emulator.program_counter, 0x20C);
    }

    #[test]
    fn wait_for_key_polls() {
        let mut emulator = Emulator::with_input(Keypad::new(), Quirks::default());
        emulator.load(&[0xF3, 0x0A]).unwrap();
        emulator.step().unwrap();
        emulator.step().unwrap();
        assert_eq!(emulator.program_counter, 0x200);

        emulator.input().press(0xC);
        emulator.input().press(0x5);
        emulator.step().unwrap();
        assert_eq!(emulator.registers[3], 0x5);
        assert_eq!(emulator.program_counter, 0x202);
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut emulator = run(&[0x60, 0x05, 0xF0, 0x15, 0x22, 0x00], 3);
        emulator.execute_single(Instruction::Draw(Reg(0), Reg(0), Const(5))).unwrap();
        emulator.reset();

        assert_eq!(emulator.registers, [0; NUM_REGISTERS]);
        assert_eq!(emulator.program_counter, 0x200);
        assert_eq!(emulator.delay_timer(), 0);
        assert!(emulator.stack().is_empty());
        assert_eq!(emulator.framebuffer().lit(), 0);
        assert_eq!(emulator.memory()[..80], Memory::new().as_slice()[..80]);
        assert!(emulator.memory()[PROGRAM_START..].iter().all(|b| *b == 0));
    }

    #[test]
    fn reset_keeps_quirks() {
        let quirks = Quirks { store_increment_ir: true, ..Quirks::default() };
        let mut emulator = with_quirks(quirks);
        emulator.reset();
        assert_eq!(emulator.quirks(), quirks);
    }

    proptest! {
        #[test]
        fn add_const_wraps_and_keeps_flag(x in 0u8..0xF, a in any::<u8>(), b in any::<u8>(), flag in any::<u8>()) {
            let mut emulator = Emulator::new();
            emulator.registers[FLAG] = flag;
            emulator.load(&[0x60 | x, a, 0x70 | x, b]).unwrap();
            emulator.run_batch(2);
            prop_assert_eq!(emulator.registers[x as usize], a.wrapping_add(b));
            prop_assert_eq!(emulator.registers[FLAG], flag);
        }

        #[test]
        fn add_flag_is_carry(vx in any::<u8>(), vy in any::<u8>()) {
            let mut emulator = Emulator::new();
            emulator.registers[0] = vx;
            emulator.registers[1] = vy;
            emulator.execute_single(Instruction::IncRegByReg(Reg(0), Reg(1))).unwrap();
            prop_assert_eq!(emulator.registers[FLAG] == 1, vx as u16 + vy as u16 > 255);
        }

        #[test]
        fn sub_flag_is_no_borrow(vx in any::<u8>(), vy in any::<u8>()) {
            let mut emulator = Emulator::new();
            emulator.registers[0] = vx;
            emulator.registers[1] = vy;
            emulator.execute_single(Instruction::DecRegByReg(Reg(0), Reg(1))).unwrap();
            prop_assert_eq!(emulator.registers[FLAG] == 1, vx >= vy);
        }

        #[test]
        fn dump_then_load_round_trips(
            values in proptest::array::uniform16(any::<u8>()),
            x in 0u8..16,
            i in 0x300u16..0x400,
            store_increment_ir in any::<bool>(),
        ) {
            let mut emulator = with_quirks(Quirks { store_increment_ir, ..Quirks::default() });
            emulator.registers = values;
            emulator.i = i;
            emulator.execute_single(Instruction::RegDump(Reg(x))).unwrap();
            let expected_i = if store_increment_ir { i + x as u16 + 1 } else { i };
            prop_assert_eq!(emulator.i, expected_i);

            emulator.registers = [0; NUM_REGISTERS];
            emulator.i = i;
            emulator.execute_single(Instruction::RegLoad(Reg(x))).unwrap();
            prop_assert_eq!(&emulator.registers[..=x as usize], &values[..=x as usize]);
        }

        #[test]
        fn drawing_twice_restores_the_screen(
            sprite in proptest::collection::vec(any::<u8>(), 1..16),
            vx in any::<u8>(),
            vy in any::<u8>(),
            background in proptest::collection::vec((0usize..64, 0usize..32), 0..64),
        ) {
            let mut emulator = with_quirks(Quirks { draw_sprite_wrap: false, ..Quirks::default() });
            for (x, y) in background {
                emulator.framebuffer.set(x, y, 1);
            }
            let before = emulator.framebuffer().clone();
            emulator.memory.copy_from(0x300, &sprite).unwrap();
            emulator.i = 0x300;
            emulator.registers[0] = vx;
            emulator.registers[1] = vy;

            let draw = Instruction::Draw(Reg(0), Reg(1), Const(sprite.len() as u8));
            emulator.execute_single(draw).unwrap();
            let after_first = emulator.framebuffer().clone();
            emulator.execute_single(draw).unwrap();

            let turned_on = (0..32).any(|y| (0..64).any(|x| before.get(x, y) == 0 && after_first.get(x, y) == 1));
            prop_assert_eq!(emulator.framebuffer(), &before);
            if turned_on {
                prop_assert_eq!(emulator.registers[FLAG], 1);
            }
        }
    }
}
