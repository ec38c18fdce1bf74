//! Runs an [InstructionStream] directly, one instruction at a time.
//!
//! Since this is platform-independent code, it will run on any platform, unlike the native code
//! generator!

use std::io::{self, ErrorKind, Read, Write};

use crate::errors::RuntimeError;
use crate::ir::{Instruction, InstructionStream, StreamIndex};
use crate::program::BrainfoldProgram;
use crate::tape::Tape;

/// What a cell holds after reading past the end of the input.
pub const END_OF_INPUT: i8 = -1;

/// A [BrainfoldProgram] that walks an [InstructionStream].
pub struct Interpreter<'a> {
    stream: &'a InstructionStream,
}

impl<'a> Interpreter<'a> {
    pub fn new(stream: &'a InstructionStream) -> Self {
        Interpreter { stream }
    }
}

impl BrainfoldProgram for Interpreter<'_> {
    fn run_with_io(
        &self,
        tape: &mut Tape,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        use Instruction::*;

        let code = self.stream.instructions();
        let tape_len = tape.len();
        let cells = tape.cells_mut();

        let mut pointer: u32 = 0;
        let mut program_counter = 0;

        while program_counter < code.len() {
            let current = pointer as usize;

            match code[program_counter] {
                MovePointerForward(amount) => {
                    pointer = pointer.wrapping_add(amount);
                    check_bounds(pointer, tape_len, program_counter)?;
                }
                MovePointerBackward(amount) => {
                    pointer = pointer.wrapping_sub(amount);
                    check_bounds(pointer, tape_len, program_counter)?;
                }
                IncrementCell(amount) => {
                    cells[current] = cells[current].wrapping_add(amount as u8 as i8);
                }
                DecrementCell(amount) => {
                    cells[current] = cells[current].wrapping_sub(amount as u8 as i8);
                }
                Output(amount) => {
                    let byte = cells[current] as u8;
                    io::copy(&mut io::repeat(byte).take(amount as u64), output)?;
                }
                Input(0) => (),
                Input(_) => {
                    // flush before blocking on input
                    output.flush()?;
                    cells[current] = read_byte(input)?;
                }
                JumpIfZero(StreamIndex(target)) => {
                    if cells[current] == 0 {
                        program_counter = target as usize;
                    }
                }
                JumpIfNonZero(StreamIndex(target)) => {
                    if cells[current] != 0 {
                        program_counter = target as usize;
                    }
                }
            }

            program_counter += 1;
        }

        output.flush()?;

        Ok(())
    }
}

fn check_bounds(pointer: u32, tape_len: usize, program_counter: usize) -> Result<(), RuntimeError> {
    if pointer as usize >= tape_len {
        return Err(RuntimeError::TapeOutOfBounds {
            pointer,
            instruction: program_counter as u32,
        });
    }

    Ok(())
}

fn read_byte(input: &mut dyn Read) -> Result<i8, RuntimeError> {
    let mut one_byte = [0u8];
    loop {
        return match input.read(&mut one_byte) {
            Ok(0) => Ok(END_OF_INPUT),
            Ok(_) => Ok(one_byte[0] as i8),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Err(e.into()),
        };
    }
}
