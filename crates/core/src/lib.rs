//! Brainfold internals.
//!
//! The pipeline is short on purpose:
//!
//!  - source code is lexed, run-length folded and bracket-resolved in a single pass into an
//!    [InstructionStream] (see [parse]);
//!  - the stream is then either _interpreted_ on a [Tape] (see [Interpreter]) or;
//!  - lowered into assembly text for one [TargetProfile] (see [emit_assembly]), which an external
//!    assembler and linker turn into an executable.

extern crate mmap_tape;
extern crate target_lexicon;

pub mod errors;
pub mod interpreter;
pub mod ir;
pub mod parsing;
pub mod target;

mod asm;
mod codegen;
mod program;
mod tape;

pub use crate::codegen::{emit_assembly, OUT_OF_BOUNDS_MESSAGE};
pub use crate::errors::{CompilationError, Location, RuntimeError, Warning, WarningKind};
pub use crate::interpreter::Interpreter;
pub use crate::ir::{Instruction, InstructionStream, StreamIndex};
pub use crate::parsing::{parse, ParsedProgram};
pub use crate::program::BrainfoldProgram;
pub use crate::tape::{Tape, DEFAULT_TAPE_LEN};
pub use crate::target::{TargetError, TargetProfile};

pub use mmap_tape::MappingError;

/// Interprets `stream` on a fresh tape of `tape_len` cells.
pub fn interpret(
    stream: &InstructionStream,
    tape_len: usize,
    input: &mut dyn std::io::Read,
    output: &mut dyn std::io::Write,
) -> Result<(), RuntimeError> {
    let mut tape = Tape::allocate(tape_len)?;
    Interpreter::new(stream).run_with_io(&mut tape, input, output)
}
