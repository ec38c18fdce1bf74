use std::fmt;

use errno::Errno;

pub type Result<T> = std::result::Result<T, MappingError>;

/// Any error thrown while mapping memory.
#[derive(Debug, Clone)]
pub enum MappingError {
    /// `mmap(2)` refuses zero-length mappings; we refuse them before asking.
    EmptyRegion,
    Internal(Errno),
}

impl From<Errno> for MappingError {
    fn from(e: Errno) -> Self {
        MappingError::Internal(e)
    }
}

impl std::error::Error for MappingError {}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MappingError::EmptyRegion => write!(f, "cannot map a region of zero bytes"),
            MappingError::Internal(e) => write!(f, "could not map memory: {}", e),
        }
    }
}
