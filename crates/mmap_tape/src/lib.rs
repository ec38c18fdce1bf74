//! Zero-initialised memory regions obtained straight from `mmap(2)`.
//!
//! A tape for a long-running program can be large, but most of it is never touched. Anonymous
//! mappings give us pages that the kernel zero-fills lazily, which is exactly the contract a tape
//! needs.

extern crate errno;
extern crate libc;

mod error;
mod mapped_region;

pub use crate::error::{MappingError, Result};
pub use crate::mapped_region::MappedRegion;
