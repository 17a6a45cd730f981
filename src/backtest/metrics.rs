use crate::engine::SimulationReport;
use rust_decimal::Decimal;
use serde::Serialize;

/// Summary of one instrument's run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub instrument: String,
    pub regime: String,
    pub bars: usize,

    // P&L
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_booked_profit: Decimal,
    pub capital_return_pct: Decimal,

    // Trade counts
    pub buys: usize,
    pub sells: usize,
    pub stop_sells: usize,
    pub realloc_buys: usize,
    pub realloc_sells: usize,
    pub profitable_exits: usize,
    pub losing_exits: usize,

    // Treasury
    pub safety_fund: Decimal,
    pub minted: u64,

    // Gateway
    pub orders_submitted: usize,
    pub orders_unconfirmed: usize,
}

impl RunReport {
    pub fn from_simulation(report: &SimulationReport) -> Self {
        let final_capital = report.final_capital();
        let capital_return_pct = if report.fund > Decimal::ZERO {
            ((final_capital - report.fund) / report.fund * Decimal::ONE_HUNDRED).round_dp(4)
        } else {
            Decimal::ZERO
        };

        let rows = report.ledger.rows();

        Self {
            instrument: report.instrument.clone(),
            regime: report.regime.to_string(),
            bars: rows.len(),
            initial_capital: report.fund,
            final_capital,
            total_booked_profit: report.ledger.total_profit(),
            capital_return_pct,
            buys: report.stats.buys,
            sells: report.stats.sells,
            stop_sells: report.stats.stop_sells,
            realloc_buys: report.stats.realloc_buys,
            realloc_sells: report.stats.realloc_sells,
            profitable_exits: rows.iter().filter(|r| r.profit > Decimal::ZERO).count(),
            losing_exits: rows.iter().filter(|r| r.profit < Decimal::ZERO).count(),
            safety_fund: report.treasury.safety_fund,
            minted: report.treasury.minted,
            orders_submitted: report.orders_submitted,
            orders_unconfirmed: report.orders_unconfirmed,
        }
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║  {:<52} ║", format!("RUN REPORT: {} ({})", self.instrument, self.regime));
        println!("╚═══════════════════════════════════════════════════════╝\n");

        println!("📊 CAPITAL");
        println!("  Bars Processed:        {}", self.bars);
        println!("  Initial Capital:       ${:.2}", self.initial_capital);
        println!(
            "  Final Capital:         ${:.2} ({:.2}%)",
            self.final_capital, self.capital_return_pct
        );
        println!("  Booked Profit:         ${:.2}", self.total_booked_profit);

        println!("\n📈 TRADES");
        println!("  Buys:                  {}", self.buys);
        println!("  Signal Sells:          {}", self.sells);
        println!("  Stop Sells:            {}", self.stop_sells);
        println!(
            "  Reallocations:         {} in / {} out",
            self.realloc_buys, self.realloc_sells
        );
        println!(
            "  Exits:                 {} profitable / {} losing",
            self.profitable_exits, self.losing_exits
        );

        println!("\n💰 TREASURY");
        println!("  Safety Fund:           ${:.2}", self.safety_fund);
        println!("  Minted Tokens:         {}", self.minted);

        println!("\n📮 ORDERS");
        println!("  Submitted:             {}", self.orders_submitted);
        if self.orders_unconfirmed > 0 {
            println!(
                "  ⚠️  Unconfirmed:         {} (ledger assumes these filled)",
                self.orders_unconfirmed
            );
        } else {
            println!("  Unconfirmed:           0");
        }

        println!("\n═════════════════════════════════════════════════════════\n");
    }
}
