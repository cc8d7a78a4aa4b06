//! Dword access to one mapped Base Address Region.

use crate::err::{Error, Result, INVALID_ARGUMENT};
use crate::mapped_region::{page_start, MappedRegion, Privilege, Region, RegionMut};
use crate::resource::ResourceHandle;

use std::path::Path;

const DWORD: usize = 4;

/// Bounds-checked, little-endian dword accessor over a mapped region.
///
/// Every write is followed by a flush of the page that contains it, so a
/// register write has reached the device by the time `write` returns, and
/// writes reach it in the order they were issued.
///
/// A `Bar` is not `Sync`. Multi-dword writes are not atomic; callers that
/// need transactions across registers must serialize access themselves.
/// Opening the same resource through two `Bar`s is unsupported: nothing
/// orders writes issued through different mappings.
#[derive(Debug)]
pub struct Bar<R> {
    region: R,
}

impl<P: Privilege> Bar<MappedRegion<P>> {
    /// Opens and maps the resource file at `path`.
    pub fn open<T: AsRef<Path>>(path: T, mode: P) -> Result<Self> {
        let resource = ResourceHandle::open::<P, _>(path)?;
        Bar::map(resource, mode)
    }

    pub fn map(resource: ResourceHandle, mode: P) -> Result<Self> {
        Ok(Bar::new(MappedRegion::new(resource, mode)?))
    }
}

impl<R: Region> Bar<R> {
    pub fn new(region: R) -> Self {
        Bar { region: region }
    }

    /// Region length in bytes.
    pub fn size(&self) -> u64 {
        self.region.size() as u64
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    /// Converts a dword index into a byte offset, rejecting anything that
    /// would touch memory outside the region.
    pub fn validate_offset(&self, index: isize) -> Result<usize> {
        self.validate_span(index, 1)
    }

    /// Checks `count` dwords starting at `index`, the whole span up front.
    fn validate_span(&self, index: isize, count: usize) -> Result<usize> {
        if index < 0 {
            return Err(Error::InvalidOffset(index));
        }
        let offset = (index as usize)
            .checked_mul(DWORD)
            .ok_or(Error::InvalidOffset(index))?;
        let end = count
            .max(1)
            .checked_mul(DWORD)
            .and_then(|len| offset.checked_add(len));
        match end {
            Some(end) if end <= self.region.size() => {}
            _ => {
                let last = offset.saturating_add(count.saturating_sub(1).saturating_mul(DWORD));
                return Err(Error::OutOfRange {
                    offset: last as u64,
                    size: self.size(),
                });
            }
        }
        if !self.region.is_open() {
            return Err(Error::mapping("access", INVALID_ARGUMENT));
        }
        Ok(offset)
    }

    pub fn read(&self, index: isize) -> Result<u32> {
        let offset = self.validate_offset(index)?;
        let value = u32::from_le(self.region.load(offset));
        trace!("read  0x{:08x} -> 0x{:08x}", offset, value);
        Ok(value)
    }

    /// Reads `count` consecutive dwords; element 0 is the dword at `index`.
    pub fn read_n(&self, index: isize, count: usize) -> Result<Vec<u32>> {
        let offset = self.validate_span(index, count)?;
        Ok((0..count)
            .map(|i| {
                let at = offset + i * DWORD;
                let value = u32::from_le(self.region.load(at));
                trace!("read  0x{:08x} -> 0x{:08x}", at, value);
                value
            })
            .collect())
    }

    /// Unmaps the region. Later accesses fail; closing again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.region.close()
    }

    pub fn into_inner(self) -> R {
        self.region
    }
}

impl<R: RegionMut> Bar<R> {
    pub fn write(&mut self, index: isize, value: u32) -> Result<()> {
        let offset = self.validate_offset(index)?;
        self.store(offset, value)
    }

    /// Writes `values` to consecutive dwords starting at `index`, flushing
    /// after each one. Stops at the first failing flush; the dword whose flush
    /// failed has already been stored, later ones are left untouched.
    pub fn write_all(&mut self, index: isize, values: &[u32]) -> Result<()> {
        let offset = self.validate_span(index, values.len())?;
        for (i, &value) in values.iter().enumerate() {
            self.store(offset + i * DWORD, value)?;
        }
        Ok(())
    }

    fn store(&mut self, offset: usize, value: u32) -> Result<()> {
        trace!("write 0x{:08x} <- 0x{:08x}", offset, value);
        self.region.store(offset, value.to_le());
        let page_size = self.region.page_size();
        self.region.flush(page_start(offset, page_size), page_size)
    }
}
