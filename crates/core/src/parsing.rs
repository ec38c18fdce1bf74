//! Turns source text into an [InstructionStream] in a single pass.
//!
//! Lexing, run-length folding and bracket resolution are interleaved: by the time the last byte
//! has been read, every jump already knows its target.

use crate::errors::{CompilationError, Location, Reason, Warning, WarningKind};
use crate::ir::{Instruction, InstructionStream, StreamIndex};

/// How many `[` may be open at once.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// The result of parsing: a stream ready for either backend, plus anything suspicious that was
/// noticed along the way.
#[derive(Debug)]
pub struct ParsedProgram {
    pub stream: InstructionStream,
    pub warnings: Vec<Warning>,
}

// public functions

/// Parses source text (really, just a bunch of bytes) into an instruction stream.
///
/// `filename` is only used to label diagnostics.
pub fn parse(source_text: &[u8], filename: &str) -> Result<ParsedProgram, CompilationError> {
    Parser::new(source_text, filename).parse()
}

// Private data structures

struct Parser<'a> {
    source: &'a [u8],
    filename: &'a str,
    pos: usize,
    line_no: u32,
    stream: InstructionStream,
    brackets: BracketStack,
    warnings: Vec<Warning>,
}

/// Open brackets still waiting for their partner, innermost last.
struct BracketStack {
    stack: Vec<(StreamIndex, u32)>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a [u8], filename: &'a str) -> Self {
        Parser {
            source,
            filename,
            pos: 0,
            line_no: 1,
            stream: InstructionStream::new(),
            brackets: BracketStack::new(),
            warnings: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<ParsedProgram, CompilationError> {
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' => self.numeric_prefix()?,
                b'>' | b'<' | b'+' | b'-' | b'.' | b',' => {
                    self.advance();
                    self.fold(byte, 0)?;
                }
                b'[' => {
                    self.advance();
                    self.open_bracket()?;
                }
                b']' => {
                    self.advance();
                    self.close_bracket()?;
                }
                b'\n' => {
                    self.advance();
                    self.line_no += 1;
                }
                _ => self.advance(),
            }
        }

        if let Some(&(_, line_no)) = self.brackets.innermost() {
            return Err(CompilationError::new(
                Reason::NotEnoughCloseBrackets,
                self.location_at(line_no),
            ));
        }

        Ok(ParsedProgram {
            stream: self.stream,
            warnings: self.warnings,
        })
    }

    /// Reads a run of decimal digits and applies it to the operator that follows, if any.
    fn numeric_prefix(&mut self) -> Result<(), CompilationError> {
        let mut prefix: u32 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            prefix = prefix
                .saturating_mul(10)
                .saturating_add((digit - b'0') as u32);
            self.advance();
        }

        match self.peek() {
            Some(op @ (b'>' | b'<' | b'+' | b'-' | b'.' | b',')) => {
                self.advance();
                self.fold(op, prefix)
            }
            Some(b'[' | b']') => {
                // the bracket itself is lexed on the next turn of the main loop
                self.warn(WarningKind::PrefixBeforeBracket);
                Ok(())
            }
            // digits followed by commentary are commentary
            _ => Ok(()),
        }
    }

    /// Folds the run of `op` that was just consumed into one instruction.
    fn fold(&mut self, op: u8, prefix: u32) -> Result<(), CompilationError> {
        use Instruction::*;

        let mut run: u32 = 1;
        while self.peek() == Some(op) {
            run = run.saturating_add(1);
            self.advance();
        }

        let mut amount = if prefix > 0 {
            run.saturating_add(prefix - 1)
        } else {
            run
        };

        if op == b',' && run > 1 {
            self.warn(WarningKind::RepeatedInput);
            amount = 0;
        }

        let instr = match op {
            b'>' => MovePointerForward(amount),
            b'<' => MovePointerBackward(amount),
            b'+' => IncrementCell(amount),
            b'-' => DecrementCell(amount),
            b'.' => Output(amount),
            b',' => Input(amount),
            _ => unreachable!("fold() called with a non-operator {:?}", op as char),
        };

        self.push(instr).map(|_| ())
    }

    fn open_bracket(&mut self) -> Result<(), CompilationError> {
        // The real target is patched in by the matching close bracket.
        let index = self.push(Instruction::JumpIfZero(StreamIndex(0)))?;

        if !self.brackets.push(index, self.line_no) {
            return Err(CompilationError::new(
                Reason::NestingTooDeep,
                self.location(),
            ));
        }

        Ok(())
    }

    fn close_bracket(&mut self) -> Result<(), CompilationError> {
        let open = match self.brackets.pop() {
            Some((open, _)) => open,
            None => {
                return Err(CompilationError::new(
                    Reason::TooManyCloseBrackets,
                    self.location(),
                ))
            }
        };

        let close = self.push(Instruction::JumpIfNonZero(open))?;
        self.stream.patch_jump_target(open, close);

        Ok(())
    }

    fn push(&mut self, instr: Instruction) -> Result<StreamIndex, CompilationError> {
        self.stream
            .push(instr)
            .ok_or_else(|| CompilationError::without_location(Reason::TooManyInstructions))
    }

    fn warn(&mut self, kind: WarningKind) {
        let location = self.location();
        self.warnings.push(Warning::new(kind, location));
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn location(&self) -> Location {
        self.location_at(self.line_no)
    }

    fn location_at(&self, line_no: u32) -> Location {
        Location::new(self.filename, line_no)
    }
}

impl BracketStack {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(MAX_NESTING_DEPTH),
        }
    }

    /// Returns false when the stack is already at [MAX_NESTING_DEPTH].
    fn push(&mut self, index: StreamIndex, line_no: u32) -> bool {
        if self.stack.len() >= MAX_NESTING_DEPTH {
            return false;
        }
        self.stack.push((index, line_no));
        true
    }

    fn pop(&mut self) -> Option<(StreamIndex, u32)> {
        self.stack.pop()
    }

    fn innermost(&self) -> Option<&(StreamIndex, u32)> {
        self.stack.last()
    }
}
