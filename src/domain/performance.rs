//! Trade-history performance summary.

use std::collections::HashMap;

use super::trade::{TradeRecord, TradeSide};

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl PerformanceSummary {
    /// Summarize closed trades. BUY rows and SELL rows without a P&L are
    /// ignored. Losses are reported as positive magnitudes.
    pub fn compute(records: &[TradeRecord]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        let closed = records
            .iter()
            .filter(|r| r.side == TradeSide::Sell)
            .filter_map(|r| r.pnl);

        for pnl in closed {
            if pnl > 0.0 {
                wins += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven += 1;
            }
        }

        let total_trades = wins + losses + breakeven;
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        PerformanceSummary {
            total_trades,
            wins,
            losses,
            breakeven,
            win_rate,
            total_pnl: total_wins - total_losses,
            avg_win: if wins > 0 { total_wins / wins as f64 } else { 0.0 },
            avg_loss: if losses > 0 {
                total_losses / losses as f64
            } else {
                0.0
            },
            profit_factor,
            largest_win,
            largest_loss,
        }
    }

    /// One summary per symbol, keyed by symbol.
    pub fn by_symbol(records: &[TradeRecord]) -> HashMap<String, PerformanceSummary> {
        let mut grouped: HashMap<String, Vec<TradeRecord>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.symbol.clone())
                .or_default()
                .push(record.clone());
        }
        grouped
            .into_iter()
            .map(|(symbol, trades)| (symbol, PerformanceSummary::compute(&trades)))
            .collect()
    }
}
