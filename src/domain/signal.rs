//! Signal scorer: an unweighted vote over the latest indicator snapshot.
//!
//! Five categories always vote (two trend, momentum, MACD, volatility);
//! the volume category votes only on a heavier-than-average bar. Strength is
//! the winning side's votes over [`MAX_VOTES`], so a sparse or split
//! evaluation reports less confidence, never more.

use std::fmt;

use crate::domain::snapshot::IndicatorSnapshot;

/// Denominator for strength, fixed whether or not the volume vote is cast.
pub const MAX_VOTES: u8 = 7;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub strength: f64,
    pub buy_votes: u8,
    pub sell_votes: u8,
}

impl Signal {
    pub fn votes_cast(&self) -> u8 {
        self.buy_votes + self.sell_votes
    }
}

#[derive(Default)]
struct Tally {
    buy: u8,
    sell: u8,
}

impl Tally {
    fn vote(&mut self, bullish: bool) {
        if bullish {
            self.buy += 1;
        } else {
            self.sell += 1;
        }
    }

    fn into_signal(self) -> Signal {
        let direction = match self.buy.cmp(&self.sell) {
            std::cmp::Ordering::Greater => Direction::Buy,
            std::cmp::Ordering::Less => Direction::Sell,
            std::cmp::Ordering::Equal => Direction::Neutral,
        };
        Signal {
            direction,
            strength: self.buy.max(self.sell) as f64 / MAX_VOTES as f64,
            buy_votes: self.buy,
            sell_votes: self.sell,
        }
    }
}

/// Score the latest snapshot against the previous bar's close.
///
/// Returns `None` if any always-voting indicator is still undefined on
/// `latest`; an undefined volume average only suppresses the volume vote.
pub fn score(latest: &IndicatorSnapshot, prev_close: f64) -> Option<Signal> {
    let ema = latest.ema?;
    let sma_fast = latest.sma_fast?;
    let sma_slow = latest.sma_slow?;
    let rsi = latest.rsi?;
    let macd = latest.macd?;
    let macd_signal = latest.macd_signal?;
    let bb_middle = latest.bb_middle?;

    let mut tally = Tally::default();

    tally.vote(ema > sma_fast);
    tally.vote(sma_fast > sma_slow);

    if (RSI_OVERSOLD..=RSI_OVERBOUGHT).contains(&rsi) {
        tally.vote(rsi > RSI_NEUTRAL);
    } else {
        // Oversold reads bullish, overbought bearish.
        tally.vote(rsi < RSI_OVERSOLD);
    }

    tally.vote(macd > macd_signal);
    tally.vote(latest.close > bb_middle);

    if let Some(volume_sma) = latest.volume_sma {
        if latest.volume as f64 > volume_sma {
            tally.vote(latest.close > prev_close);
        }
    }

    Some(tally.into_signal())
}

/// Score the last snapshot of a series. Needs at least two bars.
pub fn generate_signal(snapshots: &[IndicatorSnapshot]) -> Option<Signal> {
    match snapshots {
        [.., prev, latest] => score(latest, prev.close),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::start;
    use proptest::prelude::*;

    fn bullish_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: start(),
            close: 105.0,
            volume: 500,
            sma_fast: Some(100.0),
            sma_slow: Some(95.0),
            ema: Some(102.0),
            rsi: Some(55.0),
            macd: Some(1.0),
            macd_signal: Some(0.5),
            atr: Some(2.0),
            bb_upper: Some(108.0),
            bb_middle: Some(103.0),
            bb_lower: Some(98.0),
            obv: Some(10_000.0),
            volume_sma: Some(1000.0),
            supertrend: None,
            supertrend_trend: None,
        }
    }

    #[test]
    fn five_bullish_votes_without_volume() {
        let signal = score(&bullish_snapshot(), 104.0).unwrap();

        assert_eq!(signal.buy_votes, 5);
        assert_eq!(signal.sell_votes, 0);
        assert_eq!(signal.direction, Direction::Buy);
        assert!((signal.strength - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn heavy_volume_rising_close_adds_buy_vote() {
        let mut snap = bullish_snapshot();
        snap.volume = 2000;
        let signal = score(&snap, 104.0).unwrap();

        assert_eq!(signal.buy_votes, 6);
        assert!((signal.strength - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn heavy_volume_falling_close_adds_sell_vote() {
        let mut snap = bullish_snapshot();
        snap.volume = 2000;
        let signal = score(&snap, 106.0).unwrap();

        assert_eq!(signal.buy_votes, 5);
        assert_eq!(signal.sell_votes, 1);
        assert_eq!(signal.votes_cast(), 6);
    }

    #[test]
    fn undefined_volume_average_skips_volume_vote() {
        let mut snap = bullish_snapshot();
        snap.volume = 2000;
        snap.volume_sma = None;
        assert_eq!(score(&snap, 104.0).unwrap().votes_cast(), 5);
    }

    #[test]
    fn oversold_rsi_votes_buy() {
        let mut snap = bullish_snapshot();
        snap.rsi = Some(25.0);
        assert_eq!(score(&snap, 104.0).unwrap().buy_votes, 5);
    }

    #[test]
    fn overbought_rsi_votes_sell() {
        let mut snap = bullish_snapshot();
        snap.rsi = Some(75.0);
        let signal = score(&snap, 104.0).unwrap();
        assert_eq!(signal.buy_votes, 4);
        assert_eq!(signal.sell_votes, 1);
    }

    #[test]
    fn rsi_boundaries_use_neutral_split() {
        let mut snap = bullish_snapshot();
        snap.rsi = Some(30.0);
        assert_eq!(score(&snap, 104.0).unwrap().sell_votes, 1);

        snap.rsi = Some(70.0);
        assert_eq!(score(&snap, 104.0).unwrap().sell_votes, 0);

        snap.rsi = Some(50.0);
        assert_eq!(score(&snap, 104.0).unwrap().sell_votes, 1);
    }

    #[test]
    fn bearish_snapshot_sells() {
        let snap = IndicatorSnapshot {
            close: 90.0,
            sma_fast: Some(100.0),
            sma_slow: Some(105.0),
            ema: Some(98.0),
            rsi: Some(40.0),
            macd: Some(-1.0),
            macd_signal: Some(-0.5),
            bb_middle: Some(95.0),
            ..bullish_snapshot()
        };
        let signal = score(&snap, 91.0).unwrap();
        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(signal.sell_votes, 5);
    }

    #[test]
    fn tie_is_neutral() {
        let mut snap = bullish_snapshot();
        snap.volume = 2000;
        snap.rsi = Some(75.0);
        snap.macd = Some(0.0);
        // buy: trend x2, bollinger; sell: rsi, macd, volume
        let signal = score(&snap, 106.0).unwrap();
        assert_eq!(signal.buy_votes, 3);
        assert_eq!(signal.sell_votes, 3);
        assert_eq!(signal.direction, Direction::Neutral);
    }

    #[test]
    fn undefined_indicator_yields_none() {
        let mut snap = bullish_snapshot();
        snap.sma_slow = None;
        assert!(score(&snap, 104.0).is_none());
    }

    #[test]
    fn generate_signal_needs_two_snapshots() {
        assert!(generate_signal(&[]).is_none());
        assert!(generate_signal(&[bullish_snapshot()]).is_none());

        let mut prev = bullish_snapshot();
        prev.close = 104.0;
        let signal = generate_signal(&[prev, bullish_snapshot()]).unwrap();
        assert_eq!(signal.direction, Direction::Buy);
    }

    proptest! {
        #[test]
        fn strength_is_bounded(
            close in 1.0f64..200.0,
            prev_close in 1.0f64..200.0,
            volume in 0i64..5000,
            sma_fast in 1.0f64..200.0,
            sma_slow in 1.0f64..200.0,
            ema in 1.0f64..200.0,
            rsi in 0.0f64..100.0,
            macd in -5.0f64..5.0,
            macd_signal in -5.0f64..5.0,
            bb_middle in 1.0f64..200.0,
            volume_sma in 1.0f64..5000.0,
        ) {
            let snap = IndicatorSnapshot {
                close,
                volume,
                sma_fast: Some(sma_fast),
                sma_slow: Some(sma_slow),
                ema: Some(ema),
                rsi: Some(rsi),
                macd: Some(macd),
                macd_signal: Some(macd_signal),
                bb_middle: Some(bb_middle),
                volume_sma: Some(volume_sma),
                ..bullish_snapshot()
            };
            let signal = score(&snap, prev_close).unwrap();

            prop_assert!((0.0..=1.0).contains(&signal.strength));
            prop_assert!(signal.votes_cast() == 5 || signal.votes_cast() == 6);
            if signal.votes_cast() == 5 {
                prop_assert!(signal.strength <= 6.0 / 7.0);
            }
        }
    }
}
