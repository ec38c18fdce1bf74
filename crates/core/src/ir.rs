//! The internal representation of a program: a flat, index-stable stream of instructions.
//!
//! Both backends (the [interpreter](crate::interpreter) and the native
//! [code generator](crate::codegen)) consume this form, read-only.

use std::fmt;
use std::io;
use std::slice;

/// One instruction, with its repeat count already folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MovePointerForward(u32),
    MovePointerBackward(u32),
    IncrementCell(u32),
    DecrementCell(u32),
    Output(u32),
    Input(u32),
    /// Jump past the matching [Instruction::JumpIfNonZero] if the current cell is zero.
    JumpIfZero(StreamIndex),
    /// Jump back past the matching [Instruction::JumpIfZero] if the current cell is not zero.
    JumpIfNonZero(StreamIndex),
}

/// A position in an [InstructionStream]. Also serves as a branch target.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamIndex(pub u32);

/// An append-only sequence of [Instruction]s.
///
/// Once appended, an instruction never moves. The only mutation after the fact is patching the
/// target of a `JumpIfZero` when its closing bracket shows up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
}

// Implementation

impl InstructionStream {
    pub fn new() -> Self {
        InstructionStream {
            instructions: Vec::new(),
        }
    }

    /// Appends an instruction and returns its index.
    ///
    /// Returns None when the index would not fit in 32 bits.
    pub(crate) fn push(&mut self, instr: Instruction) -> Option<StreamIndex> {
        let index = u32::try_from(self.instructions.len()).ok()?;
        self.instructions.push(instr);
        Some(StreamIndex(index))
    }

    /// Points the `JumpIfZero` at `open` to `close`.
    ///
    /// During parsing, the target of an open bracket is unknown until its partner is lexed. This
    /// fixes that.
    pub(crate) fn patch_jump_target(&mut self, open: StreamIndex, close: StreamIndex) {
        let StreamIndex(i) = open;
        let instr = &mut self.instructions[i as usize];

        if !matches!(instr, Instruction::JumpIfZero(_)) {
            panic!("tried to patch the target of a non-branch: {:?}", instr);
        }

        *instr = Instruction::JumpIfZero(close);
    }

    /// Return a borrowed view into all instructions.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions[..]
    }

    pub fn get(&self, index: StreamIndex) -> Option<Instruction> {
        self.instructions.get(index.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Prints the stream in a pseudo-assembly format, one numbered line per instruction.
pub fn disassemble(stream: &InstructionStream, out: &mut dyn io::Write) -> io::Result<()> {
    for (i, instr) in stream.iter().enumerate() {
        writeln!(out, "{:4}: {}", i, instr)?;
    }

    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;
        match self {
            MovePointerForward(n) => write!(f, "fwd {}", n),
            MovePointerBackward(n) => write!(f, "back {}", n),
            IncrementCell(n) => write!(f, "inc {}", n),
            DecrementCell(n) => write!(f, "dec {}", n),
            Output(n) => write!(f, "out {}", n),
            Input(n) => write!(f, "in {}", n),
            JumpIfZero(target) => write!(f, "jz {}", target),
            JumpIfNonZero(target) => write!(f, "jnz {}", target),
        }
    }
}

impl fmt::Display for StreamIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn push_returns_consecutive_indices() {
        let mut stream = InstructionStream::new();
        assert_eq!(stream.push(IncrementCell(1)), Some(StreamIndex(0)));
        assert_eq!(stream.push(Output(1)), Some(StreamIndex(1)));
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn patching_rewrites_only_the_open_bracket() {
        let mut stream = InstructionStream::new();
        let open = stream.push(JumpIfZero(StreamIndex(0))).unwrap();
        let close = stream.push(JumpIfNonZero(open)).unwrap();
        stream.patch_jump_target(open, close);

        assert_eq!(stream.get(open), Some(JumpIfZero(StreamIndex(1))));
        assert_eq!(stream.get(close), Some(JumpIfNonZero(StreamIndex(0))));
    }

    #[test]
    #[should_panic]
    fn patching_a_non_branch_panics() {
        let mut stream = InstructionStream::new();
        let i = stream.push(IncrementCell(3)).unwrap();
        stream.patch_jump_target(i, i);
    }

    #[test]
    fn disassembly_is_numbered() {
        let mut stream = InstructionStream::new();
        stream.push(IncrementCell(5));
        stream.push(JumpIfZero(StreamIndex(2)));
        stream.push(JumpIfNonZero(StreamIndex(1)));

        let mut out = Vec::new();
        disassemble(&stream, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   0: inc 5\n   1: jz 2\n   2: jnz 1\n"
        );
    }
}
