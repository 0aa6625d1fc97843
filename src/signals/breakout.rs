//! Dow Theory 1-2-3 breakout and breakdown engines.
//!
//! Bullish: swing low (1), swing high (2), higher swing low (3), confirmed
//! by the first bar whose high exceeds point 2's price. Bearish is the
//! mirror: lower swing high confirmed by a break below point 2's low.
//!
//! Several pattern instances can be active at once; each confirms (or
//! dies) independently, so the output series may carry multiple `true`
//! bars.

use crate::swings::{swing_events, swing_highs, swing_lows, SwingKind, SwingPoint};
use crate::{SignalGenerator, SignalId, OHLCV};

impl_with_defaults!(Dow123BullishBreakout, Dow123BearishBreakdown);

/// An in-flight 1-2-3 pattern waiting for its confirmation bar.
#[derive(Debug, Clone, Copy)]
struct Active123 {
    /// Bar of point 3; the confirmation scan starts one past it.
    completed_bar: usize,
    /// Point 2's price, the breakout trigger level.
    trigger: f64,
    /// Point 1's price; a new extreme beyond it kills the pattern.
    kill: f64,
}

/// Scan consecutive swing-event triples for 1-2-3 shapes.
///
/// `first` and `middle` select the pattern orientation; `keep` decides
/// whether point 3 qualifies against point 1 (higher low / lower high).
fn collect_patterns(
    events: &[SwingPoint],
    first: SwingKind,
    middle: SwingKind,
    keep: impl Fn(f64, f64) -> bool,
) -> Vec<Active123> {
    let mut active = Vec::new();
    for w in events.windows(3) {
        let (p1, p2, p3) = (w[0], w[1], w[2]);
        if p1.kind == first && p2.kind == middle && p3.kind == first && keep(p1.price, p3.price) {
            active.push(Active123 {
                completed_bar: p3.bar,
                trigger: p2.price,
                kill: p1.price,
            });
        }
    }
    active
}

/// Dow Theory 1-2-3 bullish breakout.
///
/// Fires on the first bar whose high exceeds point 2's price, provided the
/// preceding bar had not already exceeded it. The pattern is abandoned if
/// a low prints below point 1 before confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dow123BullishBreakout;

impl SignalGenerator for Dow123BullishBreakout {
    fn id(&self) -> SignalId {
        SignalId("DOW_123_BULLISH_BREAKOUT")
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let n = bars.len();
        let mut signal = vec![false; n];

        let is_high = swing_highs(bars);
        let is_low = swing_lows(bars);
        let events = swing_events(bars, &is_high, &is_low);

        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        // Low -> High -> higher Low.
        let active = collect_patterns(&events, SwingKind::Low, SwingKind::High, |p1, p3| p3 > p1);

        for pattern in &active {
            for i in pattern.completed_bar + 1..n {
                if highs[i] > pattern.trigger {
                    // First-bar-only rule: a sustained breakout that was
                    // already above the trigger yesterday never signals.
                    if highs[i - 1] <= pattern.trigger {
                        signal[i] = true;
                    }
                    break;
                }
                if lows[i] < pattern.kill {
                    break;
                }
            }
        }

        signal
    }
}

/// Dow Theory 1-2-3 bearish breakdown (mirror of the bullish breakout).
///
/// Fires on the first bar whose low falls below point 2's price; killed by
/// a high above point 1 before confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dow123BearishBreakdown;

impl SignalGenerator for Dow123BearishBreakdown {
    fn id(&self) -> SignalId {
        SignalId("DOW_123_BEARISH_BREAKDOWN")
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let n = bars.len();
        let mut signal = vec![false; n];

        let is_high = swing_highs(bars);
        let is_low = swing_lows(bars);
        let events = swing_events(bars, &is_high, &is_low);

        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        // High -> Low -> lower High.
        let active = collect_patterns(&events, SwingKind::High, SwingKind::Low, |p1, p3| p3 < p1);

        for pattern in &active {
            for i in pattern.completed_bar + 1..n {
                if lows[i] < pattern.trigger {
                    if lows[i - 1] >= pattern.trigger {
                        signal[i] = true;
                    }
                    break;
                }
                if highs[i] > pattern.kill {
                    break;
                }
            }
        }

        signal
    }
}
