//! Memory region dump tool
//!
//! Dumps a region of a target process's memory to a file, or as a hex
//! listing on stdout when no file is given.

use std::fs;
use std::process::exit;

use memhole::{AccessMode, Address, DeviceSession, Pid};

fn main() -> memhole::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 || args.len() > 5 {
        eprintln!("usage: memdump <pid> <addr> <len> [file]");
        exit(1);
    }

    let pid: Pid = args[1].parse()?;
    let addr: Address = args[2].parse()?;
    let len: usize = args[3].parse().unwrap_or_else(|_| {
        eprintln!("invalid length '{}'", args[3]);
        exit(1);
    });

    let mut session = DeviceSession::new(AccessMode::ReadOnly);
    session.connect()?;
    session.attach_to_pid(pid)?;

    session.set_memory_position(addr)?;
    let bytes = session.read_memory(len)?;
    if bytes.len() < len {
        eprintln!("short read: {} of {} bytes", bytes.len(), len);
    }

    match args.get(4) {
        Some(path) => {
            fs::write(path, &bytes).map_err(memhole_channel::Error::Io)?;
            println!("wrote {} bytes to {}", bytes.len(), path);
        }
        None => {
            for (i, chunk) in bytes.chunks(16).enumerate() {
                println!("{}  {}", addr.offset((i * 16) as i64), hex::encode(chunk));
            }
        }
    }

    session.disconnect()?;
    Ok(())
}
