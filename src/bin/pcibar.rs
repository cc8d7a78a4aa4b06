//! pcibar - peek and poke PCI BAR registers from the command line.
//!
//! Usage: pcibar [--root <sysfs-dir>] <device> <command> [args]

use pcibar::{parse_int, Device, DeviceLocator, ReadOnly};

use std::convert::TryFrom;
use std::env;
use std::process::ExitCode;

const USAGE: &str = "\
Usage: pcibar [--root <sysfs-dir>] <device> <command> [args]

Commands:
    info                              IDs and regions of the device
    read <bar> <index> [count]        read dwords at a dword index
    write <bar> <index> <value>...    write dwords starting at a dword index

Numbers may be decimal or 0x-prefixed hex.
The sysfs root defaults to $PCIBAR_SYSFS_ROOT, then /sys/bus/pci/devices.";

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut root = env::var("PCIBAR_SYSFS_ROOT").ok();
    let mut i = 0;

    while i < args.len() && args[i].starts_with('-') {
        match args[i].as_str() {
            "-h" | "--help" => {
                println!("{}", USAGE);
                return ExitCode::SUCCESS;
            }
            "-V" | "--version" => {
                println!("pcibar {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "-r" | "--root" if i + 1 < args.len() => {
                i += 1;
                root = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                return ExitCode::from(2);
            }
        }
        i += 1;
    }

    if args.len() < i + 2 {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    let mut locator = DeviceLocator::new(&args[i]);
    if let Some(root) = root {
        locator = locator.root(root);
    }
    let cmd_args: Vec<&str> = args[i + 2..].iter().map(|s| s.as_str()).collect();

    let dev = match locator.open() {
        Ok(dev) => dev,
        Err(err) => {
            eprintln!("pcibar: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = match args[i + 1].as_str() {
        "info" => info(&dev),
        "read" => read(&dev, &cmd_args),
        "write" => write(&dev, &cmd_args),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pcibar: {}", err);
            ExitCode::FAILURE
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Parses a numeric argument that has to fit `T`.
fn number<T: TryFrom<u64>>(arg: Option<&&str>, what: &str) -> CliResult<T> {
    let text = arg.ok_or_else(|| format!("missing {}", what))?;
    parse_int(text)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| format!("bad {}: {:?}", what, text).into())
}

fn info(dev: &Device) -> CliResult<()> {
    println!("device {}", dev.id());
    for (name, value) in &[
        ("vendor", dev.vendor()),
        ("device", dev.device()),
        ("revision", dev.revision()),
        ("subsystem_vendor", dev.subsystem_vendor()),
        ("subsystem_device", dev.subsystem_device()),
    ] {
        match value {
            Ok(v) => println!("  {:<17} 0x{:04x}", name, v),
            Err(err) if err.is_not_found() => println!("  {:<17} -", name),
            Err(err) => println!("  {:<17} ({})", name, err),
        }
    }
    for index in dev.bars() {
        match dev.resource_info(index) {
            Ok(res) => println!("  bar{}  0x{:016x}  {:>10} bytes  {:?}",
                                index, res.start, res.len(), res.flags),
            Err(_) => println!("  bar{}", index),
        }
    }
    Ok(())
}

fn read(dev: &Device, args: &[&str]) -> CliResult<()> {
    let bar: usize = number(args.get(0), "bar")?;
    let index: isize = number(args.get(1), "index")?;
    let count: usize = match args.get(2) {
        Some(_) => number(args.get(2), "count")?,
        None => 1,
    };

    let bar = dev.bar_with(bar, ReadOnly)?;
    for (i, value) in bar.read_n(index, count)?.into_iter().enumerate() {
        println!("0x{:08x}: 0x{:08x}", (index as usize + i) * 4, value);
    }
    Ok(())
}

fn write(dev: &Device, args: &[&str]) -> CliResult<()> {
    let bar: usize = number(args.get(0), "bar")?;
    let index: isize = number(args.get(1), "index")?;
    if args.len() < 3 {
        return Err("missing value".into());
    }
    let values = args[2..]
        .iter()
        .map(|arg| number::<u32>(Some(arg), "value"))
        .collect::<CliResult<Vec<u32>>>()?;

    let mut bar = dev.bar(bar)?;
    bar.write_all(index, &values)?;
    Ok(bar.close()?)
}

#[test]
fn test_number_rejects_out_of_range_index() {
    let err = number::<isize>(Some(&"0xffffffffffffffff"), "index").unwrap_err();
    assert_eq!(err.to_string(), "bad index: \"0xffffffffffffffff\"");
    assert_eq!(number::<isize>(Some(&"0x10"), "index").unwrap(), 16);
    assert!(number::<u32>(Some(&"0x100000000"), "value").is_err());
    assert_eq!(number::<u32>(Some(&"0xffffffff"), "value").unwrap(), u32::max_value());
    assert_eq!(number::<usize>(None, "bar").unwrap_err().to_string(), "missing bar");
}
