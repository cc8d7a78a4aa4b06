use super::{page_size, Region, RegionMut};
use crate::err::{Error, Result, INVALID_ARGUMENT};

/// Plain in-memory stand-in for a mapped BAR.
///
/// Every flushed range is recorded in issue order so callers can check when
/// and what a register accessor pushed to the "device".
#[derive(Debug, Clone)]
pub struct HeapRegion {
    bytes: Vec<u8>,
    flushes: Vec<(usize, usize)>,
    page_size: usize,
    flushes_left: Option<usize>,
    open: bool,
}

impl HeapRegion {
    pub fn new(size: usize) -> Self {
        HeapRegion {
            bytes: vec![0; size],
            flushes: Vec::new(),
            page_size: page_size(),
            flushes_left: None,
            open: true,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        HeapRegion {
            bytes: bytes,
            ..HeapRegion::new(0)
        }
    }

    /// Pretends the platform page is `page_size` bytes (a power of two).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size.is_power_of_two());
        self.page_size = page_size;
        self
    }

    /// Lets `ok` more flushes succeed, then fails every one after that the
    /// way a rejected `msync` would.
    pub fn fail_flush_after(mut self, ok: usize) -> Self {
        self.flushes_left = Some(ok);
        self
    }

    fn check(&self, offset: usize) {
        assert!(self.open, "access to a closed region");
        assert!(offset % 4 == 0, "misaligned dword offset 0x{:x}", offset);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `(offset, bytes)` of every flush so far, oldest first.
    pub fn flushes(&self) -> &[(usize, usize)] {
        &self.flushes
    }
}

impl Region for HeapRegion {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn load(&self, offset: usize) -> u32 {
        self.check(offset);
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_ne_bytes(word)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}

impl RegionMut for HeapRegion {
    fn store(&mut self, offset: usize, value: u32) {
        self.check(offset);
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    fn flush(&mut self, offset: usize, bytes: usize) -> Result<()> {
        match self.flushes_left {
            Some(0) => return Err(Error::mapping("msync", INVALID_ARGUMENT)),
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        self.flushes.push((offset, bytes));
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

#[test]
fn test_heap_region() {
    let mut region = HeapRegion::new(8).with_page_size(4);
    region.store(4, 0xAABB_CCDD);
    assert_eq!(region.load(4), 0xAABB_CCDD);
    assert_eq!(region.load(0), 0);
    region.flush(4, 4).unwrap();
    assert_eq!(region.flushes(), &[(4, 4)]);
    assert_eq!(region.page_size(), 4);
}

#[test]
fn test_fail_flush_after() {
    let mut region = HeapRegion::new(8).fail_flush_after(1);
    region.flush(0, 4).unwrap();
    assert!(region.flush(0, 4).is_err());
    assert!(region.flush(0, 4).is_err());
    assert_eq!(region.flushes(), &[(0, 4)]);
}

#[test]
#[should_panic(expected = "closed region")]
fn test_load_after_close_panics() {
    let mut region = HeapRegion::new(8);
    region.close().unwrap();
    region.load(0);
}
