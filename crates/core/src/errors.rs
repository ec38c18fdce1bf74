//! All errors (and warnings) that can be _generated_ by the compiler.
use std::fmt;
use std::io;

use mmap_tape::MappingError;

/// Any error that occurs as a result of compiling the source code.
#[derive(Debug)]
pub struct CompilationError {
    reason: Reason,
    location: Option<Location>,
}

/// Something suspicious in the source code that does not stop compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    kind: WarningKind,
    location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    filename: String,
    line_no: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    TooManyCloseBrackets,
    NotEnoughCloseBrackets,
    NestingTooDeep,
    TooManyInstructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    PrefixBeforeBracket,
    RepeatedInput,
}

/// Any error that occurs while a program is being interpreted.
#[derive(Debug)]
pub enum RuntimeError {
    /// The tape pointer moved outside of the tape.
    TapeOutOfBounds { pointer: u32, instruction: u32 },
    /// Memory for the tape could not be mapped.
    Allocation(MappingError),
    Io(io::Error),
}

impl CompilationError {
    pub fn new(reason: Reason, location: Location) -> Self {
        CompilationError {
            reason,
            location: Some(location),
        }
    }

    pub fn without_location(reason: Reason) -> Self {
        CompilationError {
            reason,
            location: None,
        }
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn message(&self) -> &'static str {
        self.reason.message()
    }

    pub fn message_identifier(&self) -> u32 {
        self.reason.message_identifier()
    }
}

impl Reason {
    pub fn message_identifier(&self) -> u32 {
        use Reason::*;
        match self {
            TooManyCloseBrackets => 0x001,
            NotEnoughCloseBrackets => 0x002,
            NestingTooDeep => 0x003,
            TooManyInstructions => 0x004,
        }
    }

    pub fn message(&self) -> &'static str {
        use Reason::*;
        match self {
            TooManyCloseBrackets => "too many ']' brackets. Check that each '[' has a matching ']'",
            NotEnoughCloseBrackets => {
                "missing closing bracket: input ended before this '[' was closed"
            }
            NestingTooDeep => "brackets are nested too deeply (the limit is 1000 levels)",
            TooManyInstructions => "program has too many instructions",
        }
    }
}

impl Warning {
    pub fn new(kind: WarningKind, location: Location) -> Self {
        Warning { kind, location }
    }

    pub fn kind(&self) -> WarningKind {
        self.kind
    }
}

impl WarningKind {
    pub fn message_identifier(&self) -> u32 {
        match self {
            WarningKind::PrefixBeforeBracket => 0x101,
            WarningKind::RepeatedInput => 0x102,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::PrefixBeforeBracket => {
                "numeric prefix has no meaning before a bracket and was ignored"
            }
            WarningKind::RepeatedInput => {
                "repeated ',' without moving the pointer overwrites the same cell; input ignored"
            }
        }
    }
}

impl Location {
    pub fn new(filename: impl Into<String>, line_no: u32) -> Self {
        Location {
            filename: filename.into(),
            line_no,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(err: io::Error) -> RuntimeError {
        RuntimeError::Io(err)
    }
}

impl From<MappingError> for RuntimeError {
    fn from(err: MappingError) -> RuntimeError {
        RuntimeError::Allocation(err)
    }
}

impl std::error::Error for CompilationError {}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            RuntimeError::Allocation(e) => Some(e),
            RuntimeError::TapeOutOfBounds { .. } => None,
        }
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let location = self
            .location
            .as_ref()
            .map(|l| format!("{}:", l))
            .unwrap_or_else(|| String::from(""));

        write!(
            f,
            "error[{:04x}]:{} {}",
            self.message_identifier(),
            location,
            self.message()
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "warning[{:04x}]:{}: {}",
            self.kind.message_identifier(),
            self.location,
            self.kind.message()
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::TapeOutOfBounds {
                pointer,
                instruction,
            } => write!(
                f,
                "runtime error: tape pointer out of bounds (pointer {} after instruction {})",
                pointer, instruction
            ),
            RuntimeError::Allocation(e) => write!(f, "runtime error: {}", e),
            RuntimeError::Io(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line_no)
    }
}
