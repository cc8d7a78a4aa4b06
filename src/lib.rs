//! Memory-mapped access to PCI Base Address Regions.
//!
//! ```no_run
//! use pcibar::Device;
//!
//! let dev = Device::open("0000:03:00.0")?;
//! let mut bar = dev.bar(0)?;
//! bar.write(0, 0xDEAD_BEEF)?;
//! assert_eq!(bar.read(0)?, 0xDEAD_BEEF);
//! # Ok::<(), pcibar::Error>(())
//! ```

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

/// Mapping privilege: loads only.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly;

/// Mapping privilege: loads and stores.
#[derive(Debug, Clone, Copy)]
pub struct ReadWrite;

mod err;
pub use self::err::{Error, Result};

pub mod mapped_region;
pub use self::mapped_region::{MappedRegion, Privilege, Region, RegionMut};

mod resource;
pub use self::resource::ResourceHandle;

mod bar;
pub use self::bar::Bar;

mod device;
pub use self::device::*;
