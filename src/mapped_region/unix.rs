use super::{Privilege, Region, RegionMut};
use crate::err::{Error, ErrCode, Result, INVALID_ARGUMENT};
use crate::resource::ResourceHandle;
use crate::ReadWrite;

use std::fmt;
use std::marker::PhantomData;
use std::ptr;

/// One `mmap` of a whole resource, unmapped on `close` or drop.
pub struct MappedRegion<P> {
    base: *mut libc::c_void,
    size: usize,
    open: bool,
    mode: PhantomData<P>,
}

// The mapping is owned by exactly one value. Moving it to another thread is
// fine; sharing it is not, so no `Sync`.
unsafe impl<P> Send for MappedRegion<P> {}

impl<P: Privilege> MappedRegion<P> {
    /// Maps the full length of `resource`. The descriptor is closed when this
    /// returns; the mapping stays valid without it.
    pub fn new(resource: ResourceHandle, mode: P) -> Result<Self> {
        let size = resource.len() as usize;
        if size == 0 {
            return Err(Error::mapping("mmap", INVALID_ARGUMENT));
        }

        let base = unsafe {
            libc::mmap(ptr::null_mut(), size, P::MAP_PROT, libc::MAP_SHARED, resource.as_raw_fd(), 0)
        };
        if base == libc::MAP_FAILED {
            return Err(Error::mapping("mmap", ErrCode::last_error()));
        }

        debug!("mapped {} ({} bytes, writable: {}) at {:p}",
               resource.path().display(), size, mode.writable(), base);
        Ok(MappedRegion {
            base: base,
            size: size,
            open: true,
            mode: PhantomData,
        })
    }
}

impl<P> MappedRegion<P> {
    /// Panics on a closed mapping or an offset that is misaligned or runs
    /// past the end; nothing past this point touches the pointer unchecked.
    fn ptr(&self, offset: usize) -> *mut u32 {
        assert!(self.open, "access to an unmapped region");
        assert!(offset % 4 == 0, "misaligned dword offset 0x{:x}", offset);
        assert!(offset.checked_add(4).map_or(false, |end| end <= self.size),
                "offset (0x{:x}) exceeds region size (0x{:x})", offset, self.size);
        unsafe { (self.base as *mut u8).add(offset) as *mut u32 }
    }
}

impl<P> Region for MappedRegion<P> {
    fn size(&self) -> usize {
        self.size
    }

    fn load(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.ptr(offset)) }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    /// The region counts as closed even when `munmap` reports an error;
    /// there is nothing left the caller could retry.
    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        match unsafe { libc::munmap(self.base, self.size) } {
            -1 => Err(Error::mapping("munmap", ErrCode::last_error())),
            _ => {
                debug!("unmapped {} bytes at {:p}", self.size, self.base);
                Ok(())
            }
        }
    }
}

impl RegionMut for MappedRegion<ReadWrite> {
    fn store(&mut self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.ptr(offset), value) }
    }

    fn flush(&mut self, offset: usize, bytes: usize) -> Result<()> {
        if !self.open || offset >= self.size {
            return Err(Error::mapping("msync", INVALID_ARGUMENT));
        }
        let addr = unsafe { (self.base as *mut u8).add(offset) as *mut libc::c_void };
        match unsafe { libc::msync(addr, bytes, libc::MS_SYNC) } {
            -1 => Err(Error::mapping("msync", ErrCode::last_error())),
            _ => Ok(()),
        }
    }
}

impl<P> fmt::Debug for MappedRegion<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("open", &self.open)
            .finish()
    }
}

impl<P> Drop for MappedRegion<P> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("{}", err);
        }
    }
}
