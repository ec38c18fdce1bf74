//! The interpreter's memory: a fixed number of signed byte cells, all starting at zero.

use std::ops::{Index, IndexMut};

use mmap_tape::{MappedRegion, MappingError};

/// How many cells a tape has when nobody asks for anything else.
pub const DEFAULT_TAPE_LEN: usize = 1_000_000;

pub struct Tape {
    region: MappedRegion,
}

impl Tape {
    /// Maps a fresh, zeroed tape of `len` cells.
    pub fn allocate(len: usize) -> Result<Self, MappingError> {
        Ok(Tape {
            region: MappedRegion::allocate(len)?,
        })
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn cells(&self) -> &[i8] {
        // i8 and u8 share size and alignment
        unsafe { std::slice::from_raw_parts(self.region.addr() as *const i8, self.region.len()) }
    }

    pub fn cells_mut(&mut self) -> &mut [i8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.region.addr_mut() as *mut i8, self.region.len())
        }
    }
}

impl<I> Index<I> for Tape
where
    I: std::slice::SliceIndex<[i8]>,
{
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.cells()[index]
    }
}

impl<I> IndexMut<I> for Tape
where
    I: std::slice::SliceIndex<[i8]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.cells_mut()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tape_starts_blank() {
        let tape = Tape::allocate(DEFAULT_TAPE_LEN).unwrap();
        assert_eq!(tape.len(), DEFAULT_TAPE_LEN);
        assert!(tape[..].iter().all(|&cell| cell == 0));
    }

    #[test]
    fn cells_are_signed() {
        let mut tape = Tape::allocate(16).unwrap();
        tape[3] = -1;
        assert_eq!(tape.cells()[3], -1);
        assert_eq!(tape.region[3], 0xFF);
    }

    #[test]
    fn default_tape_reaches_past_thirty_thousand() {
        let mut tape = Tape::allocate(DEFAULT_TAPE_LEN).unwrap();
        tape[100_000] = 65;
        assert_eq!(tape.cells()[100_000], 65);
    }
}
