//! Locating a PCI device in sysfs and reading its attribute files.

use crate::bar::Bar;
use crate::err::{Error, Result};
use crate::mapped_region::{MappedRegion, Privilege};
use crate::resource::ResourceHandle;
use crate::ReadWrite;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// Number of BAR slots a PCI function can expose.
pub const MAX_BARS: usize = 6;

bitflags! {
    /// `IORESOURCE_*` bits from the third column of a sysfs `resource` table.
    pub struct ResourceFlags: u64 {
        const IO        = 0x0000_0100;
        const MEM       = 0x0000_0200;
        const PREFETCH  = 0x0000_2000;
        const READONLY  = 0x0000_4000;
        const CACHEABLE = 0x0000_8000;
        const SIZEALIGN = 0x0004_0000;
        const MEM_64    = 0x0010_0000;
        const WINDOW    = 0x0020_0000;
        const DISABLED  = 0x1000_0000;
        const UNSET     = 0x2000_0000;
        const BUSY      = 0x8000_0000;
    }
}

/// One line of the `resource` table: where a region sits in the physical
/// address space and what kind of region it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceInfo {
    pub start: u64,
    pub end: u64,
    pub flags: ResourceFlags,
}

impl ResourceInfo {
    fn parse(line: &str) -> Option<Self> {
        let mut cols = line.split_whitespace().map(parse_int);
        let start = cols.next()??;
        let end = cols.next()??;
        let flags = cols.next()??;
        Some(ResourceInfo {
            start: start,
            end: end,
            flags: ResourceFlags::from_bits_truncate(flags),
        })
    }

    /// Length in bytes; 0 for an unused slot.
    pub fn len(&self) -> u64 {
        if self.end == 0 || self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses integers the way sysfs prints them: `0x`/`0o`/`0b` prefixed or
/// plain decimal.
pub fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, radix) = if text.starts_with("0x") || text.starts_with("0X") {
        (&text[2..], 16)
    } else if text.starts_with("0o") || text.starts_with("0O") {
        (&text[2..], 8)
    } else if text.starts_with("0b") || text.starts_with("0B") {
        (&text[2..], 2)
    } else {
        (text, 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix).ok()
}

/// Where to look for a device. Defaults to the live sysfs tree.
pub struct DeviceLocator {
    root: PathBuf,
    id: String,
}

impl DeviceLocator {
    /// `id` is the PCI address, e.g. `"0000:03:00.0"`.
    pub fn new<T: AsRef<str>>(id: T) -> Self {
        DeviceLocator {
            root: PathBuf::from(SYSFS_PCI_DEVICES),
            id: id.as_ref().to_owned(),
        }
    }

    pub fn root<T: AsRef<Path>>(mut self, root: T) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn open(self) -> Result<Device> {
        let path = self.root.join(&self.id);
        if !path.is_dir() {
            return Err(Error::ResourceNotFound(path));
        }
        debug!("found device {} at {}", self.id, path.display());
        Ok(Device {
            path: path,
            id: self.id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    path: PathBuf,
    id: String,
}

impl Device {
    /// Opens `id` under `/sys/bus/pci/devices`.
    pub fn open<T: AsRef<str>>(id: T) -> Result<Self> {
        DeviceLocator::new(id).open()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resource_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("resource{}", index))
    }

    /// Whether the device exposes a mappable region at `index`.
    pub fn has_bar(&self, index: usize) -> bool {
        index < MAX_BARS && self.resource_path(index).is_file()
    }

    /// Indices of all regions the device exposes, ascending.
    pub fn bars(&self) -> Vec<usize> {
        (0..MAX_BARS).filter(|&i| self.has_bar(i)).collect()
    }

    pub fn resource<P: Privilege>(&self, index: usize) -> Result<ResourceHandle> {
        let path = self.resource_path(index);
        if index >= MAX_BARS {
            return Err(Error::ResourceNotFound(path));
        }
        ResourceHandle::open::<P, _>(path)
    }

    /// Maps region `index` for reading and writing.
    pub fn bar(&self, index: usize) -> Result<Bar<MappedRegion<ReadWrite>>> {
        self.bar_with(index, ReadWrite)
    }

    pub fn bar_with<P: Privilege>(&self, index: usize, mode: P) -> Result<Bar<MappedRegion<P>>> {
        let resource = self.resource::<P>(index)?;
        Bar::map(resource, mode)
    }

    /// Placement and flags of region `index` from the `resource` table.
    pub fn resource_info(&self, index: usize) -> Result<ResourceInfo> {
        let table = self.attr_text("resource")?;
        table
            .lines()
            .nth(index)
            .and_then(ResourceInfo::parse)
            .ok_or_else(|| Error::ResourceNotFound(self.resource_path(index)))
    }

    fn attr_text(&self, name: &str) -> Result<String> {
        match fs::read_to_string(self.path.join(name)) {
            Ok(text) => Ok(text),
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                Err(Error::AttributeUnavailable(name.to_owned()))
            }
            Err(err) => Err(Error::mapping("read", err)),
        }
    }

    /// Reads a numeric attribute file such as `vendor`.
    pub fn attr(&self, name: &str) -> Result<u32> {
        let text = self.attr_text(name)?;
        let value = text.trim_end_matches('\n');
        parse_int(value)
            .and_then(|v| if v <= u64::from(u32::max_value()) { Some(v as u32) } else { None })
            .ok_or_else(|| Error::InvalidAttribute {
                name: name.to_owned(),
                value: value.to_owned(),
            })
    }

    pub fn vendor(&self) -> Result<u32> {
        self.attr("vendor")
    }

    pub fn device(&self) -> Result<u32> {
        self.attr("device")
    }

    pub fn revision(&self) -> Result<u32> {
        self.attr("revision")
    }

    pub fn subsystem_vendor(&self) -> Result<u32> {
        self.attr("subsystem_vendor")
    }

    pub fn subsystem_device(&self) -> Result<u32> {
        self.attr("subsystem_device")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x10ee"), Some(0x10ee));
        assert_eq!(parse_int("0X10EE"), Some(0x10ee));
        assert_eq!(parse_int("42\n"), Some(42));
        assert_eq!(parse_int("0o17"), Some(0o17));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("vendor"), None);
    }

    #[test]
    fn test_resource_line() {
        let info = ResourceInfo::parse("0x00000000fb000000 0x00000000fbffffff 0x0000000000140204").unwrap();
        assert_eq!(info.start, 0xfb00_0000);
        assert_eq!(info.len(), 0x100_0000);
        assert!(info.flags.contains(ResourceFlags::MEM | ResourceFlags::MEM_64));
        assert!(!info.flags.contains(ResourceFlags::PREFETCH));

        let unused = ResourceInfo::parse("0x0000000000000000 0x0000000000000000 0x0000000000000000").unwrap();
        assert!(unused.is_empty());
        assert!(ResourceInfo::parse("0x1000").is_none());
    }
}
