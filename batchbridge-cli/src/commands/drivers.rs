//! Driver listing

use anyhow::Result;
use batchbridge_client::{DriverConfig, DriverRegistry, FallbackPolicy, TracingObserver};
use colored::*;

/// Print every registered driver
///
/// With `states`, each driver is built with a default configuration so its
/// mapping table can be shown.
pub fn list_drivers(states: bool) -> Result<()> {
    let registry = DriverRegistry::builtin();
    let descriptors = registry.descriptors();

    println!("{}", format!("{} driver(s) available:", descriptors.len()).bold());
    println!();
    for d in descriptors {
        println!("  {} {} {}", "▸".cyan(), d.name.bold(), format!("v{}", d.version).dimmed());
        println!("    {}", d.nice_name);
        if !d.description.is_empty() {
            println!("    {}", d.description.dimmed());
        }

        if states {
            let driver = registry.create(&d.name, DriverConfig::default(), TracingObserver::shared())?;
            let table = driver.state_table();
            for (token, state) in table.entries() {
                println!("      {:<14} → {}", token, state);
            }
            match table.fallback() {
                FallbackPolicy::DefaultTo(state) => {
                    println!("      {:<14} → {}", "(unknown)".dimmed(), state)
                }
                FallbackPolicy::FailOnUnknown => {
                    println!("      {:<14} → {}", "(unknown)".dimmed(), "error".red())
                }
            }
        }
        println!();
    }

    Ok(())
}
