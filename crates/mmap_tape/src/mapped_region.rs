use std::ops::{Drop, Index, IndexMut};
use std::ptr;

use errno::errno;
use libc::{c_void, size_t};

use crate::MappingError;

/// A readable and writable region of anonymous memory mapped by `mmap(2)`.
///
/// Every byte starts out as zero. The `munmap(2)` is automatically called when the value is
/// dropped.
pub struct MappedRegion {
    addr: *mut c_void,
    len: size_t,
}

impl MappedRegion {
    /// Allocate a region of the given size (in bytes).
    pub fn allocate(size: usize) -> crate::Result<Self> {
        use libc::{MAP_ANON, MAP_PRIVATE, PROT_READ, PROT_WRITE};

        if size == 0 {
            return Err(MappingError::EmptyRegion);
        }

        let memory;
        unsafe {
            memory = libc::mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            );
        }

        if memory == libc::MAP_FAILED {
            return Err(errno().into());
        }

        Ok(MappedRegion {
            addr: memory,
            len: size,
        })
    }

    /// Returns the address of the mapped memory.
    pub fn addr(&self) -> *const u8 {
        self.addr as *const u8
    }

    /// Returns the address of the mapped memory, for writing.
    pub fn addr_mut(&mut self) -> *mut u8 {
        self.addr as *mut u8
    }

    /// Size of the region, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.addr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.addr_mut(), self.len) }
    }
}

impl<I> Index<I> for MappedRegion
where
    I: std::slice::SliceIndex<[u8]>,
{
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<I> IndexMut<I> for MappedRegion
where
    I: std::slice::SliceIndex<[u8]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.addr, self.len);
        }
        self.addr = ptr::null_mut();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_region_is_zeroed() {
        let region = MappedRegion::allocate(8192).unwrap();
        assert_eq!(region.len(), 8192);
        assert!(region[..].iter().all(|&b| b == 0));
    }

    #[test]
    fn region_is_writable() {
        let mut region = MappedRegion::allocate(4096).unwrap();
        region[0] = 0xAB;
        region[4095] = 0x01;
        assert_eq!(region[0], 0xAB);
        assert_eq!(region[4095], 0x01);
        assert_eq!(region[1], 0);
    }

    #[test]
    fn zero_length_is_refused() {
        assert!(matches!(
            MappedRegion::allocate(0),
            Err(MappingError::EmptyRegion)
        ));
    }
}
