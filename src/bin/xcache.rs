// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use log::{error, info, warn};
use xcache::core::config::XcacheConfig;
use xcache::core::error::Result;
use xcache::core::system::{Script, System, DEFAULT_TIMEOUT};

/// Cycle-accurate cache controller simulator
#[derive(Parser)]
#[command(name = "xcache")]
#[command(about = "Runs a request script through the cache controller", long_about = None)]
struct Args {
    /// Path to the request script (.toml)
    script: String,

    /// Controller configuration file (.toml); built-in defaults otherwise
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Maximum number of cycles to simulate
    #[arg(short = 'n', long, default_value = "1000000")]
    cycles: u64,

    /// Print the full run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Optional .env with RUST_LOG / XCACHE_TIMEOUT overrides
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("xcache v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            XcacheConfig::load(path)?
        }
        None => XcacheConfig::default(),
    };

    info!("Loading script from: {}", args.script);
    let script = Script::load(&args.script).inspect_err(|e| error!("Failed to load script: {}", e))?;

    let timeout = match std::env::var("XCACHE_TIMEOUT") {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid XCACHE_TIMEOUT={}", value);
            DEFAULT_TIMEOUT
        }),
        Err(_) => DEFAULT_TIMEOUT,
    };

    let mut system = System::from_script(config, &script)?.with_timeout(timeout);
    let report = system
        .run(args.cycles)
        .inspect_err(|e| error!("Simulation stopped at cycle {}: {}", system.cycles(), e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for fetch in &report.fetches {
        println!(
            "{:>8}  fetch  0x{:08X} -> 0x{:08X}{}",
            fetch.cycle,
            fetch.addr,
            fetch.instruction,
            if fetch.error { "  ERROR" } else { "" }
        );
    }
    for access in &report.accesses {
        println!(
            "{:>8}  {:<17} 0x{:08X} w=0x{:08X} r=0x{:08X}{}",
            access.cycle,
            format!("{:?}", access.kind),
            access.addr,
            access.wdata,
            access.rdata,
            if access.error { "  ERROR" } else { "" }
        );
    }
    println!();
    println!("{}", report.stats);

    if report.write_bus_errors > 0 {
        warn!("{} posted writes failed on the bus", report.write_bus_errors);
    }
    if report.finished {
        info!("Simulation completed in {} cycles", report.cycles);
    } else {
        warn!("Cycle limit reached after {} cycles", report.cycles);
    }

    Ok(())
}
