//! Feeds a raw `.fic` capture (32-byte FIB+CRC blocks, CRC already stripped
//! by convention in these dumps) through a [`FibProcessor`] and prints the
//! resulting ensemble directory as JSON.
//!
//! This binary is a manual exercise surface, not part of the crate's public
//! contract — analogous to the teacher's `src/main.rs`/`frame-forwarder`
//! binaries, which also call `colog::init()` before doing their real work.

use std::env;
use std::fs;
use std::process::ExitCode;

use fib_processor::FibProcessor;
use log::{info, warn};

const FIB_BLOCK_LEN: usize = 32;

fn main() -> ExitCode {
    colog::init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: feed_fic <capture.fic>");
            return ExitCode::FAILURE;
        }
    };

    let data = match fs::read(&path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if data.len() % FIB_BLOCK_LEN != 0 {
        warn!(
            "{} is not a multiple of {FIB_BLOCK_LEN} bytes; trailing bytes ignored",
            path
        );
    }

    let processor = FibProcessor::new();
    processor.set_on_new_ensemble_name(Box::new(|name| {
        info!("ensemble name: {name}");
    }));
    processor.set_on_service_detected(Box::new(|id, label| {
        info!("service detected: {id:#06x} {label}");
    }));
    processor.set_on_date_time_update(Box::new(|dt| {
        info!(
            "date/time: {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            dt.year, dt.month, dt.day, dt.hour, dt.minutes, dt.seconds
        );
    }));

    for (fib_index, chunk) in data.chunks_exact(FIB_BLOCK_LEN).enumerate() {
        let mut buf = [0u8; 30];
        buf.copy_from_slice(&chunk[..30]);
        processor.process_fib(&buf);
        let _ = fib_index; // currently unused, per spec §6
    }

    let snapshot = serde_json::json!({
        "ensemble_name": processor.get_ensemble_name(),
        "sync_reached": processor.sync_reached(),
        "date_time": processor.get_date_time(),
        "services": processor.get_service_list(),
    });

    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
    ExitCode::SUCCESS
}
