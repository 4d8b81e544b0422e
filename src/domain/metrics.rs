//! Performance summary: a pure projection of the trade log.

use super::position::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub trade_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    /// Fraction of trades with positive P&L, 0..=1.
    pub win_rate: f64,
    /// Gross winning pips over gross losing pips; `f64::INFINITY` with no losers.
    pub profit_factor: f64,
    pub average_win_pips: f64,
    /// Mean of the losing trades' P&L, so negative (or 0 with no losers).
    pub average_loss_pips: f64,
    pub total_pips: f64,
    /// Mean P&L per trade.
    pub expectancy_pips: f64,
    pub largest_win_pips: f64,
    pub largest_loss_pips: f64,
    pub average_bars_in_trade: f64,
}

impl PerformanceSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut breakeven = 0usize;
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars = 0usize;

        for trade in trades {
            let pnl = trade.pnl_pips;
            if pnl > 0.0 {
                winners += 1;
                gross_win += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losers += 1;
                gross_loss += pnl;
                largest_loss = largest_loss.min(pnl);
            } else {
                breakeven += 1;
            }
            total_bars += trade.bars_in_trade;
        }

        let trade_count = trades.len();
        let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

        let profit_factor = if gross_loss < 0.0 {
            gross_win / gross_loss.abs()
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        PerformanceSummary {
            trade_count,
            winners,
            losers,
            breakeven,
            win_rate: ratio(winners as f64, trade_count),
            profit_factor,
            average_win_pips: ratio(gross_win, winners),
            average_loss_pips: ratio(gross_loss, losers),
            total_pips: gross_win + gross_loss,
            expectancy_pips: ratio(gross_win + gross_loss, trade_count),
            largest_win_pips: largest_win,
            largest_loss_pips: largest_loss,
            average_bars_in_trade: ratio(total_bars as f64, trade_count),
        }
    }
}
