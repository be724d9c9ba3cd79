// SPDX-License-Identifier: MPL-2.0

//! Demo program: drive a LuxOS miner towards a power target and print
//! synchronizer events.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example power_limit -- <host> <target_watts> [minutes]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=luxos_sync=debug cargo run --example power_limit -- 192.168.1.50 3000 10
//! ```

use std::env;
use std::time::Duration;

use luxos_sync::{Miner, SyncEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luxos_sync=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: {} <host> <target_watts> [minutes]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example power_limit -- 192.168.1.50 3000 10");
        std::process::exit(1);
    }

    let host = &args[1];
    let target: f64 = args[2].parse()?;
    let minutes: u64 = args.get(3).map_or(Ok(5), |m| m.parse())?;

    let miner = Miner::http(host).build()?;
    let mut events = miner.subscribe();

    println!("Polling {host}...");
    let snapshot = miner.poll_once().await?;
    println!(
        "{} ({}) draws {:.0} W at {:.1} TH/s, profile {}, {}",
        snapshot.model.as_deref().unwrap_or("unknown model"),
        snapshot.firmware_version,
        snapshot.power_watts,
        snapshot.hashrate.five_sec,
        snapshot.profile_name.as_deref().unwrap_or("-"),
        snapshot.sleep_state,
    );

    miner.set_target(Some(target))?;
    miner.start();
    println!("Converging on {target:.0} W for {minutes} minute(s)...");

    let deadline = tokio::time::sleep(Duration::from_secs(minutes * 60));
    tokio::pin!(deadline);
    let mut report = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = events.recv() => match event {
                Ok(SyncEvent::CommandFailed { command, error, .. }) => {
                    println!("Command {command} failed: {error}");
                }
                Ok(event) => println!("Event: {event:?}"),
                Err(e) => println!("Event stream: {e}"),
            },
            _ = report.tick() => {
                let status = miner.controller_status();
                let power = miner.current_snapshot().map(|s| s.power_watts);
                println!(
                    "Mode {:?}, measured {:?} W, last limit {:?} W",
                    status.mode, power, status.last_command_watts
                );
            }
        }
    }

    miner.stop().await?;
    println!("Done!");
    Ok(())
}
