//! Twelve-bar consolidation breakout engine.
//!
//! A qualifying swing low anchors a 12-bar measurement window; the
//! window's highest high becomes resistance. The signal fires on the
//! first bar after the window whose high clears that resistance, unless
//! price falls below the anchor first.

use crate::swings::swing_lows;
use crate::{SignalGenerator, SignalId, OHLCV};

impl_with_defaults!(TwelveBarBreakout);

/// Breakout above a 12-bar consolidation measured from a valid swing low.
///
/// A swing low is a valid anchor only when the immediately preceding
/// swing low is not lower: a "higher low" marks mid-uptrend continuation
/// rather than a base, and is rejected. At most one signal per anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwelveBarBreakout;

impl TwelveBarBreakout {
    /// Window length in bars, anchor inclusive.
    pub const WINDOW: usize = 12;
}

impl SignalGenerator for TwelveBarBreakout {
    fn id(&self) -> SignalId {
        SignalId("TWELVE_BAR_BREAKOUT")
    }

    fn min_bars(&self) -> usize {
        Self::WINDOW + 2
    }

    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let n = bars.len();
        let mut signal = vec![false; n];

        let is_swing_low = swing_lows(bars);
        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        let swing_lows: Vec<(usize, f64)> = (0..n)
            .filter(|&i| is_swing_low[i])
            .map(|i| (i, lows[i]))
            .collect();

        // Valid anchors: the previous swing low must not be lower.
        let valid_anchors = swing_lows.iter().enumerate().filter_map(|(k, &(bar, price))| {
            if k > 0 && swing_lows[k - 1].1 < price {
                None
            } else {
                Some((bar, price))
            }
        });

        for (anchor_bar, anchor_price) in valid_anchors {
            let window_end = anchor_bar + Self::WINDOW - 1;

            // Need the full window plus at least one bar for the breakout.
            if window_end >= n.saturating_sub(1) {
                continue;
            }

            let mut invalidated = false;
            let mut resistance = highs[anchor_bar];
            for i in anchor_bar..(anchor_bar + Self::WINDOW).min(n) {
                if lows[i] < anchor_price {
                    invalidated = true;
                    break;
                }
                if highs[i] > resistance {
                    resistance = highs[i];
                }
            }
            if invalidated {
                continue;
            }

            for i in anchor_bar + Self::WINDOW..n {
                if highs[i] > resistance {
                    signal[i] = true;
                    break;
                }
                if lows[i] < anchor_price {
                    break;
                }
            }
        }

        signal
    }
}
