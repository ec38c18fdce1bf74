//! Textual assemblers for each supported instruction set.

use std::fmt;

pub mod aarch64;
pub mod x86_64;

/// Writes one instruction, formatted like `format!`.
macro_rules! asm {
    ($text: expr, $($fmt: expr),+) => {{
        $text.instruction(format_args!($($fmt),+))
    }};
}
pub(crate) use asm;

/// A branch label in the assembly
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Label(pub usize);

/// An assembly module being written, line by line.
pub struct AssemblyText {
    text: String,
    comment: &'static str,
}

impl AssemblyText {
    pub fn new(comment: &'static str) -> Self {
        AssemblyText {
            text: String::new(),
            comment,
        }
    }

    /// An indented instruction.
    pub fn instruction(&mut self, instr: fmt::Arguments) {
        self.text.push_str("    ");
        self.text.push_str(&instr.to_string());
        self.text.push('\n');
    }

    /// A symbol definition, flush left.
    pub fn symbol(&mut self, name: impl fmt::Display) {
        self.text.push_str(&format!("{}:\n", name));
    }

    pub fn comment(&mut self, comment: &str) {
        self.text.push_str(&format!("{} {}\n", self.comment, comment));
    }

    pub fn blank_line(&mut self) {
        self.text.push('\n');
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}
