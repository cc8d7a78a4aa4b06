use crate::err::Result;
use crate::{ReadOnly, ReadWrite};

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use self::unix::*;

mod heap;
pub use self::heap::HeapRegion;

pub trait Privilege {
    fn writable(&self) -> bool;

    #[doc(hidden)]
    const O_RD: i32;

    #[doc(hidden)]
    const MAP_PROT: i32;
}

impl Privilege for ReadOnly {
    fn writable(&self) -> bool {
        false
    }

    #[doc(hidden)]
    const O_RD: i32 = libc::O_RDONLY;

    #[doc(hidden)]
    const MAP_PROT: i32 = libc::PROT_READ;
}

impl Privilege for ReadWrite {
    fn writable(&self) -> bool {
        true
    }

    #[doc(hidden)]
    const O_RD: i32 = libc::O_RDWR;

    #[doc(hidden)]
    const MAP_PROT: i32 = libc::PROT_READ | libc::PROT_WRITE;
}

/// A fixed-size byte range that dwords can be loaded from.
///
/// Callers such as `Bar` validate offsets before getting here and report
/// errors as `Result`s. Implementations still panic on a closed region or an
/// offset that is misaligned or out of bounds, so no safe call can reach
/// memory outside the region.
pub trait Region {
    fn size(&self) -> usize;

    /// Native-endian load of the dword at `offset`.
    fn load(&self, offset: usize) -> u32;

    fn is_open(&self) -> bool {
        true
    }

    /// Releases the backing storage. Calling it again is a no-op.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A region that accepts stores and can push them through to the backing
/// resource.
pub trait RegionMut: Region {
    /// Native-endian store of `value` at `offset`.
    fn store(&mut self, offset: usize, value: u32);

    /// Make `bytes` starting at the page-aligned `offset` visible to the
    /// backing resource before returning.
    fn flush(&mut self, offset: usize, bytes: usize) -> Result<()>;

    /// Granularity of `flush`.
    fn page_size(&self) -> usize {
        page_size()
    }
}

pub fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Start of the `page_size` page containing `offset`.
pub fn page_start(offset: usize, page_size: usize) -> usize {
    debug_assert!(page_size.is_power_of_two());
    offset & !(page_size - 1)
}

#[test]
fn test_page_start() {
    let ps = page_size();
    assert!(ps.is_power_of_two());
    assert_eq!(page_start(0, ps), 0);
    assert_eq!(page_start(4, ps), 0);
    assert_eq!(page_start(ps - 4, ps), 0);
    assert_eq!(page_start(ps, ps), ps);
    assert_eq!(page_start(ps + 12, ps), ps);
    assert_eq!(page_start(0x1_2344, 0x1000), 0x1_2000);
}

#[test]
fn test_privilege() {
    assert_eq!(ReadOnly.writable(), false);
    assert_eq!(ReadWrite.writable(), true);
}
