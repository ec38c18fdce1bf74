//! Defines [BrainfoldProgram] that allows you to run a program, regardless of how it's
//! implemented.

use std::io::{self, BufWriter, Read, Write};

use crate::errors::RuntimeError;
use crate::tape::Tape;

/// A [BrainfoldProgram] is ready to be executed. Just give it a tape!
pub trait BrainfoldProgram {
    /// Run the program on a tape, reading from `input` and writing to `output`.
    ///
    /// End of input is not an error: reading past it stores `-1` in the current cell.
    fn run_with_io(
        &self,
        tape: &mut Tape,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError>;

    /// Runs the program with the default IO (prints to `stdout`; accepts input from `stdin`)
    fn run(&self, tape: &mut Tape) -> Result<(), RuntimeError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut input = stdin.lock();
        let mut output = BufWriter::new(stdout.lock());

        self.run_with_io(tape, &mut input, &mut output)
    }
}
