//! Downtrend reversal engine.
//!
//! Mean-reversion entry when a confirmed downtrend breaks. The downtrend
//! is confirmed by a [`Dow123BearishBreakdown`] signal; from then on the
//! machine tracks the latest swing high as resistance and the lowest
//! swing low as the trend low, and fires on the first bar that either
//! breaks resistance or prints a swing low above the trend low.

use super::breakout::Dow123BearishBreakdown;
use crate::swings::{swing_highs, swing_lows};
use crate::{SignalGenerator, SignalId, OHLCV};

impl_with_defaults!(DowntrendReversal);

/// Downtrend reversal (buy) signal.
///
/// Entry when either:
/// - a bar's high breaks above the tracked resistance, on the first such
///   bar only, or
/// - a new swing low forms strictly above the tracked trend low.
///
/// The resistance break is evaluated first. Firing resets the machine to
/// wait for the next confirmed downtrend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DowntrendReversal;

impl SignalGenerator for DowntrendReversal {
    fn id(&self) -> SignalId {
        SignalId("DOWNTREND_REVERSAL")
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let n = bars.len();
        let mut signal = vec![false; n];

        let is_swing_high = swing_highs(bars);
        let is_swing_low = swing_lows(bars);
        let bearish = Dow123BearishBreakdown::with_defaults().generate(bars);

        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        let mut in_downtrend = false;
        // Resistance to break above while in a downtrend.
        let mut last_swing_high_price: Option<f64> = None;
        // Most recent swing low, for seeding the trend low on entry.
        let mut last_swing_low_price: Option<f64> = None;
        // Lowest swing low seen in the current downtrend.
        let mut trend_low_price: Option<f64> = None;

        for i in 0..n {
            // Swings are confirmed at this bar; read them before deciding.
            let current_swing_high = is_swing_high[i].then(|| highs[i]);
            let current_swing_low = is_swing_low[i].then(|| lows[i]);

            if bearish[i] && !in_downtrend {
                in_downtrend = true;
                last_swing_high_price = current_swing_high.or(last_swing_high_price);
                trend_low_price = current_swing_low.or(last_swing_low_price);
                // The signal fires on the reversal, not on the breakdown bar.
            } else if in_downtrend {
                let mut reversal_triggered = false;

                // Breakout above resistance, first bar only.
                if let Some(resistance) = last_swing_high_price {
                    if highs[i] > resistance && i > 0 && highs[i - 1] <= resistance {
                        reversal_triggered = true;
                    }
                }

                // Higher low: a new swing low above the trend low.
                if let (Some(low), Some(trend_low)) = (current_swing_low, trend_low_price) {
                    if low > trend_low {
                        reversal_triggered = true;
                    }
                }

                if reversal_triggered {
                    signal[i] = true;
                    in_downtrend = false;
                    last_swing_high_price = None;
                    trend_low_price = None;
                } else {
                    if let Some(high) = current_swing_high {
                        last_swing_high_price = Some(high);
                    }
                    if let Some(low) = current_swing_low {
                        if trend_low_price.map_or(true, |t| low < t) {
                            trend_low_price = Some(low);
                        }
                    }
                }
            }

            // Trailing swing prices feed the next downtrend's entry state.
            if let Some(high) = current_swing_high {
                last_swing_high_price = Some(high);
            }
            if let Some(low) = current_swing_low {
                last_swing_low_price = Some(low);
            }
        }

        signal
    }
}
