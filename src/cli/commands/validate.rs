//! Validate configuration command.

use anyhow::Result;
use backtest_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.backtest.validate() {
        println!("Invalid backtest settings: {}", e);
        return Err(e.into());
    }

    let backtest = &config.backtest;
    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Data directory: {}", config.app.data_dir.display());
    println!("Log level: {}", config.logging.level);
    println!("Initial cash: {}", backtest.initial_cash);
    println!("Frequency: {}", backtest.frequency);
    println!("Commission model: {:?}", backtest.commission_model);
    println!("Slippage: {} bps", backtest.slippage_bps);
    println!(
        "Fill timing: {}",
        if backtest.fill_at_next_open { "next open" } else { "same close" }
    );
    println!(
        "Benchmark: {}",
        backtest.benchmark_symbol.as_deref().unwrap_or("none")
    );

    Ok(())
}
