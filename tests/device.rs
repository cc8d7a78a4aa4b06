use pcibar::{Device, DeviceLocator, Error, ReadOnly, Region, ResourceFlags};

use std::fs;
use std::path::Path;

const ID: &str = "0000:03:00.0";

fn fake_device(root: &Path, bars: &[(usize, usize)]) {
    let dir = root.join(ID);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("vendor"), "0x10ee\n").unwrap();
    fs::write(dir.join("device"), "0x7024\n").unwrap();
    fs::write(dir.join("revision"), "0x00\n").unwrap();
    fs::write(dir.join("subsystem_vendor"), "4334\n").unwrap();

    let mut table = String::new();
    for index in 0..6 {
        match bars.iter().find(|&&(i, _)| i == index) {
            Some(&(_, len)) => {
                fs::write(dir.join(format!("resource{}", index)), vec![0u8; len]).unwrap();
                let start = 0xf700_0000u64 + (index as u64) * 0x10_0000;
                table.push_str(&format!("0x{:016x} 0x{:016x} 0x{:016x}\n",
                                        start, start + len as u64 - 1, 0x0004_0200u64));
            }
            None => table.push_str("0x0000000000000000 0x0000000000000000 0x0000000000000000\n"),
        }
    }
    fs::write(dir.join("resource"), table).unwrap();
}

fn open(root: &Path) -> Device {
    DeviceLocator::new(ID).root(root).open().unwrap()
}

#[test]
fn test_missing_device() {
    let root = tempfile::tempdir().unwrap();
    match DeviceLocator::new(ID).root(root.path()).open() {
        Err(Error::ResourceNotFound(path)) => assert_eq!(path, root.path().join(ID)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_attributes() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[]);
    let dev = open(root.path());

    assert_eq!(dev.id(), ID);
    assert_eq!(dev.vendor().unwrap(), 0x10ee);
    assert_eq!(dev.device().unwrap(), 0x7024);
    assert_eq!(dev.revision().unwrap(), 0);
    assert_eq!(dev.subsystem_vendor().unwrap(), 4334);
    match dev.subsystem_device() {
        Err(Error::AttributeUnavailable(name)) => assert_eq!(name, "subsystem_device"),
        other => panic!("unexpected {:?}", other),
    }

    fs::write(root.path().join(ID).join("vendor"), "nvidia\n").unwrap();
    match dev.vendor() {
        Err(Error::InvalidAttribute { name, value }) => {
            assert_eq!(name, "vendor");
            assert_eq!(value, "nvidia");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_bar_presence() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[(0, 4096), (2, 64)]);
    let dev = open(root.path());

    assert_eq!(dev.bars(), vec![0, 2]);
    assert!(dev.has_bar(2));
    assert!(!dev.has_bar(1));
    assert!(!dev.has_bar(6));

    match dev.bar(1) {
        Err(ref err) if err.is_not_found() => {}
        other => panic!("unexpected {:?}", other),
    }
    assert!(dev.bar(7).unwrap_err().is_not_found());
}

#[test]
fn test_resource_info() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[(0, 4096)]);
    let dev = open(root.path());

    let info = dev.resource_info(0).unwrap();
    assert_eq!(info.start, 0xf700_0000);
    assert_eq!(info.len(), 4096);
    assert!(info.flags.contains(ResourceFlags::MEM));
    assert!(!info.flags.contains(ResourceFlags::IO));
    assert!(dev.resource_info(3).unwrap().is_empty());

    let resource = dev.resource::<ReadOnly>(0).unwrap();
    assert_eq!(resource.len(), 4096);
    assert!(dev.resource::<ReadOnly>(3).unwrap_err().is_not_found());
}

#[test]
fn test_write_reaches_resource_file() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[(0, 8192)]);
    let dev = open(root.path());

    let mut bar = dev.bar(0).unwrap();
    assert_eq!(bar.size(), 8192);
    bar.write(0, 0x0102_0304).unwrap();
    bar.write_all(1024, &[0xDEAD_BEEF, 0xCAFE_F00D]).unwrap();
    assert_eq!(bar.read_n(1024, 2).unwrap(), vec![0xDEAD_BEEF, 0xCAFE_F00D]);
    match bar.read(2048) {
        Err(Error::OutOfRange { offset, size }) => {
            assert_eq!(offset, 8192);
            assert_eq!(size, 8192);
        }
        other => panic!("unexpected {:?}", other),
    }

    // Flushed writes are visible through an ordinary read of the file.
    let bytes = fs::read(root.path().join(ID).join("resource0")).unwrap();
    assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(&bytes[4096..4100], &0xDEAD_BEEFu32.to_le_bytes());

    bar.close().unwrap();
    bar.close().unwrap();
    assert!(bar.read(0).is_err());
}

#[test]
fn test_read_only_bar() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[(2, 64)]);
    let dir = root.path().join(ID);
    let mut contents = vec![0u8; 64];
    contents[60..].copy_from_slice(&[0xEF, 0xBE, 0xAD, 0xDE]);
    fs::write(dir.join("resource2"), contents).unwrap();

    let dev = open(root.path());
    let bar = dev.bar_with(2, ReadOnly).unwrap();
    assert!(bar.region().is_open());
    assert_eq!(bar.read(15).unwrap(), 0xDEAD_BEEF);
    assert_eq!(bar.size(), 64);
}

#[test]
fn test_zero_length_resource() {
    let root = tempfile::tempdir().unwrap();
    fake_device(root.path(), &[]);
    fs::write(root.path().join(ID).join("resource4"), b"").unwrap();

    let dev = open(root.path());
    assert!(dev.has_bar(4));
    match dev.bar(4) {
        Err(Error::Mapping { op, .. }) => assert_eq!(op, "mmap"),
        other => panic!("unexpected {:?}", other),
    }
}
