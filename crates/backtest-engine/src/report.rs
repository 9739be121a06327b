//! Backtest report generation.

use std::fmt::Write;

use crate::result::BacktestResult;

const RULE: &str = "═══════════════════════════════════════════════════════════\n";
const SECTION: &str = "───────────────────────────────────────────────────────────\n";

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

impl BacktestResult {
    /// Generate a text summary.
    pub fn summary_text(&self) -> String {
        let s = &self.summary;
        let mut out = String::new();

        out.push_str(RULE);
        out.push_str("                     BACKTEST REPORT                        \n");
        out.push_str(RULE);
        out.push('\n');

        let _ = writeln!(out, "  Strategy:            {}", self.strategy);
        let _ = writeln!(out, "  Instruments:         {}", self.instruments.join(", "));
        let _ = writeln!(out, "  Period:              {} to {}", self.config.start, self.config.end);
        if self.cancelled {
            out.push_str("  Status:              CANCELLED (partial results)\n");
        }
        out.push('\n');

        out.push_str("PERFORMANCE\n");
        out.push_str(SECTION);
        let _ = writeln!(out, "  Initial Cash:        ${:.2}", self.config.initial_cash);
        let _ = writeln!(out, "  Final Equity:        ${:.2}", s.final_equity);
        let _ = writeln!(out, "  Total Return:        {:.2}%", s.total_return * 100.0);
        let _ = writeln!(out, "  Annualized Return:   {:.2}%", s.annualized_return * 100.0);
        let _ = writeln!(out, "  Max Drawdown:        {:.2}%", s.max_drawdown * 100.0);
        out.push('\n');

        out.push_str("RISK METRICS\n");
        out.push_str(SECTION);
        let _ = writeln!(out, "  Sharpe Ratio:        {:.2}", s.sharpe);
        let _ = writeln!(out, "  Sortino Ratio:       {:.2}", s.sortino);
        let _ = writeln!(out, "  Calmar Ratio:        {:.2}", s.calmar);
        let _ = writeln!(out, "  Volatility:          {:.2}%", s.volatility * 100.0);
        let _ = writeln!(out, "  Alpha:               {}", optional(s.alpha));
        let _ = writeln!(out, "  Beta:                {}", optional(s.beta));
        out.push('\n');

        out.push_str("TRADE STATISTICS\n");
        out.push_str(SECTION);
        let _ = writeln!(out, "  Total Trades:        {}", s.total_trades);
        let _ = writeln!(out, "  Closed Trades:       {}", s.closed_trades);
        let _ = writeln!(out, "  Win Rate:            {:.2}%", s.win_rate * 100.0);
        let _ = writeln!(out, "  Avg Trade Return:    {:.2}%", s.avg_trade_return * 100.0);
        let rejected = self.orders.iter().filter(|o| !o.status.is_filled()).count();
        let _ = writeln!(out, "  Rejected Orders:     {}", rejected);
        out.push('\n');

        out.push_str("EXECUTION\n");
        out.push_str(SECTION);
        let _ = writeln!(out, "  Bars Processed:      {}", self.bars_processed);
        let _ = writeln!(out, "  Equity Points:       {}", self.equity_curve.len());
        out.push('\n');

        out.push_str(RULE);
        out
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the equity curve to CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity,benchmark_equity\n");
        for point in &self.equity_curve {
            let benchmark = point
                .benchmark_equity
                .map(|b| b.to_string())
                .unwrap_or_default();
            let _ = writeln!(csv, "{},{},{}", point.timestamp.to_rfc3339(), point.equity, benchmark);
        }
        csv
    }
}
