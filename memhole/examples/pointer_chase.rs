//! Pointer chase example
//!
//! Reads a pointer-sized value at a known address, follows it with an
//! offset, and reads the field it lands on. The classic use is pulling a
//! value out of a heap object reachable from a static.

use std::process::exit;

use byteorder::{ByteOrder, LittleEndian};
use memhole::{AccessMode, Address, DeviceSession, Pid};

fn main() -> memhole::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: pointer_chase <pid> <addr> <offset>");
        exit(1);
    }

    let pid: Pid = args[1].parse()?;
    let addr: Address = args[2].parse()?;
    let offset: i64 = i64::from_str_radix(args[3].trim_start_matches("0x"), 16).unwrap_or_else(|_| {
        eprintln!("invalid offset '{}'", args[3]);
        exit(1);
    });

    let mut session = DeviceSession::new(AccessMode::ReadOnly);
    session.connect()?;
    session.attach_to_pid(pid)?;

    // follow the base pointer
    session.set_memory_position(addr)?;
    let raw = session.read_memory(8)?;
    let target = Address::new(LittleEndian::read_u64(&raw)).offset(offset);
    println!("{} -> {}", addr, target);

    // read the field behind it
    session.set_memory_position(target)?;
    let field = session.read_memory(8)?;
    println!("{}: {:02x?} ({})", target, &field[..], LittleEndian::read_u64(&field));

    session.disconnect()?;
    Ok(())
}
