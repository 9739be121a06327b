//! List strategies command.

use anyhow::Result;
use backtest_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for (id, info) in registry.list() {
        println!("  {} ({})", info.name, id);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Default config: {}", info.default_config);
        println!();
    }

    println!("Use --strategy <name> to select a strategy and --strategy-config <file.json> to override its defaults.");
    println!();
    println!("Strategy names: {}", registry.names().join(", "));

    Ok(())
}
