//! Alternating swing-point detection.
//!
//! A swing high is a locally confirmed turn from up to down, a swing low
//! the reverse. Confirmed swings must alternate in kind; the single
//! exception is an outside bar that engulfs both of its non-inside
//! neighbors, which registers as a swing high AND a swing low on the same
//! bar.
//!
//! Both detectors run a single forward pass with bounded lookback and
//! lookahead that skips inside bars. They are deliberately NOT mirror
//! images of each other:
//!
//! - [`swing_highs`] treats Up-or-Down bars as directional neighbors;
//!   [`swing_lows`] treats not-Inside-and-not-Outside bars as directional,
//!   which additionally admits reference bars. The two definitions only
//!   coincide when every bar matches one of the four comparisons.
//! - [`swing_highs`] skips its alternation bookkeeping on a bar that just
//!   confirmed a swing; [`swing_lows`] runs it unconditionally.
//!
//! These asymmetries are observable in the output and are relied on by
//! the pattern engines; do not "repair" them.

use crate::bars::{classify_bars, BarKind};
use crate::OHLCV;

/// Kind of a confirmed swing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed swing point: bar position, kind, and the defining price
/// (the bar's high for a swing high, its low for a swing low).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingPoint {
    pub bar: usize,
    pub kind: SwingKind,
    pub price: f64,
}

/// Detect swing highs over the full bar sequence.
///
/// Returns a boolean series of the input length. Sequences too short to
/// contain a directional neighbor on each side produce no swings.
pub fn swing_highs<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    let kinds = classify_bars(bars);
    let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
    let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();
    swing_highs_from(&kinds, &highs, &lows)
}

/// Detect swing lows over the full bar sequence.
pub fn swing_lows<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    let kinds = classify_bars(bars);
    let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
    let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();
    swing_lows_from(&kinds, &highs, &lows)
}

fn next_not_inside(kinds: &[BarKind], i: usize) -> Option<usize> {
    (i + 1..kinds.len()).find(|&j| kinds[j] != BarKind::Inside)
}

fn prev_not_inside(kinds: &[BarKind], i: usize) -> Option<usize> {
    (0..i).rev().find(|&j| kinds[j] != BarKind::Inside)
}

pub(crate) fn swing_highs_from(kinds: &[BarKind], highs: &[f64], lows: &[f64]) -> Vec<bool> {
    let n = kinds.len();
    let mut is_swing_high = vec![false; n];
    let mut last_swing: Option<SwingKind> = None;

    for i in 0..n {
        let mut detected_this_bar = false;
        if kinds[i] == BarKind::Inside {
            continue;
        }

        // Nearest non-inside neighbors. No right neighbor means the swing
        // cannot be confirmed and the alternation state is left untouched.
        let Some(right_idx) = next_not_inside(kinds, i) else {
            continue;
        };
        let left_idx = prev_not_inside(kinds, i);

        let current_high = highs[i];
        let current_low = lows[i];

        // Nearest Up-or-Down bars on each side.
        let left_dir_idx = (0..i).rev().find(|&j| kinds[j].is_directional());
        let right_dir_idx = (i + 1..n).find(|&j| kinds[j].is_directional());

        // Outside bar engulfing both neighbors: swing high and swing low
        // on the same bar, no alternation gate.
        if kinds[i] == BarKind::Outside {
            if let Some(left) = left_idx {
                let not_engulfed_high =
                    current_high > highs[left] && current_high > highs[right_idx];
                let not_engulfed_low = current_low < lows[left] && current_low < lows[right_idx];
                if not_engulfed_high && not_engulfed_low {
                    is_swing_high[i] = true;
                    last_swing = Some(SwingKind::High);
                    continue;
                }
            }
        }

        if kinds[i] == BarKind::Up {
            if kinds[right_idx] == BarKind::Down {
                // Up -> Down: high at the Up bar when lows turned down.
                if lows[right_idx] < current_low
                    && matches!(last_swing, None | Some(SwingKind::Low))
                {
                    is_swing_high[i] = true;
                    last_swing = Some(SwingKind::High);
                    detected_this_bar = true;
                }
            } else if kinds[right_idx] == BarKind::Outside {
                // Up -> Outside(s) -> Up: high at the first Up bar.
                // Up -> Outside(s) -> Down resolves at the outside bar below.
                if let Some(rd) = right_dir_idx {
                    if kinds[rd] == BarKind::Up
                        && lows[right_idx] < current_low
                        && matches!(last_swing, None | Some(SwingKind::Low))
                    {
                        is_swing_high[i] = true;
                        last_swing = Some(SwingKind::High);
                        detected_this_bar = true;
                    }
                }
            }
        } else if let (BarKind::Outside, Some(left)) = (kinds[i], left_idx) {
            let left_is_up = left_dir_idx.is_some_and(|j| kinds[j] == BarKind::Up);
            let left_is_down = left_dir_idx.is_some_and(|j| kinds[j] == BarKind::Down);
            let right_is_down = right_dir_idx.is_some_and(|j| kinds[j] == BarKind::Down);

            if left_is_up && right_is_down {
                // Up -> Outside(s) -> Down: high at the last outside bar
                // before the Down bar.
                let next_is_outside = kinds[right_idx] == BarKind::Outside;
                if (!next_is_outside || Some(right_idx) == right_dir_idx)
                    && matches!(last_swing, None | Some(SwingKind::Low))
                {
                    is_swing_high[i] = true;
                    last_swing = Some(SwingKind::High);
                    detected_this_bar = true;
                }
            } else if left_is_down
                && right_is_down
                && current_high > highs[left]
                && current_high > highs[right_idx]
                && matches!(last_swing, None | Some(SwingKind::Low))
            {
                // Down -> Outside -> Down with the highest high of the three.
                is_swing_high[i] = true;
                last_swing = Some(SwingKind::High);
                detected_this_bar = true;
            }
        }

        // Opportunistic alternation bookkeeping: a down/outside bar whose
        // right neighbor prints a higher high indicates an approaching low.
        // Skipped when this bar already confirmed a swing.
        if !detected_this_bar
            && matches!(kinds[i], BarKind::Down | BarKind::Outside)
            && highs[right_idx] > current_high
            && matches!(last_swing, None | Some(SwingKind::High))
        {
            last_swing = Some(SwingKind::Low);
        }
    }

    is_swing_high
}

pub(crate) fn swing_lows_from(kinds: &[BarKind], highs: &[f64], lows: &[f64]) -> Vec<bool> {
    let n = kinds.len();
    let mut is_swing_low = vec![false; n];
    let mut last_swing: Option<SwingKind> = None;

    for i in 0..n {
        if kinds[i] == BarKind::Inside {
            continue;
        }

        let Some(right_idx) = next_not_inside(kinds, i) else {
            continue;
        };
        let left_idx = prev_not_inside(kinds, i);

        let current_high = highs[i];
        let current_low = lows[i];

        // Nearest not-inside-and-not-outside bars on each side. This
        // admits reference bars, unlike the swing-high detector.
        let left_dir_idx = (0..i).rev().find(|&j| kinds[j].is_not_inside_or_outside());
        let right_dir_idx = (i + 1..n).find(|&j| kinds[j].is_not_inside_or_outside());

        if kinds[i] == BarKind::Outside {
            if let Some(left) = left_idx {
                let not_engulfed_high =
                    current_high > highs[left] && current_high > highs[right_idx];
                let not_engulfed_low = current_low < lows[left] && current_low < lows[right_idx];
                if not_engulfed_high && not_engulfed_low {
                    is_swing_low[i] = true;
                    last_swing = Some(SwingKind::Low);
                    continue;
                }
            }
        }

        if kinds[i] == BarKind::Down {
            if kinds[right_idx] == BarKind::Up {
                // Down -> Up: low at the Down bar when highs turned up.
                if highs[right_idx] > current_high
                    && matches!(last_swing, None | Some(SwingKind::High))
                {
                    is_swing_low[i] = true;
                    last_swing = Some(SwingKind::Low);
                }
            } else if kinds[right_idx] == BarKind::Outside {
                // Down -> Outside(s) -> Down: low at the first Down bar.
                // Down -> Outside(s) -> Up resolves at the outside bar below.
                if let Some(rd) = right_dir_idx {
                    if kinds[rd] == BarKind::Down
                        && highs[right_idx] > current_high
                        && matches!(last_swing, None | Some(SwingKind::High))
                    {
                        is_swing_low[i] = true;
                        last_swing = Some(SwingKind::Low);
                    }
                }
            }
        } else if let (BarKind::Outside, Some(left)) = (kinds[i], left_idx) {
            let left_is_down = left_dir_idx.is_some_and(|j| kinds[j] == BarKind::Down);
            let left_is_up = left_dir_idx.is_some_and(|j| kinds[j] == BarKind::Up);
            let right_is_up = right_dir_idx.is_some_and(|j| kinds[j] == BarKind::Up);

            if left_is_down && right_is_up {
                // Down -> Outside(s) -> Up: low at the last outside bar
                // before the Up bar.
                let next_is_outside = kinds[right_idx] == BarKind::Outside;
                if (!next_is_outside || Some(right_idx) == right_dir_idx)
                    && matches!(last_swing, None | Some(SwingKind::High))
                {
                    is_swing_low[i] = true;
                    last_swing = Some(SwingKind::Low);
                }
            } else if left_is_up
                && right_is_up
                && current_low < lows[left]
                && current_low < lows[right_idx]
                && matches!(last_swing, None | Some(SwingKind::High))
            {
                // Up -> Outside -> Up with the lowest low of the three.
                is_swing_low[i] = true;
                last_swing = Some(SwingKind::Low);
            }
        }

        // Alternation bookkeeping. Runs on every up/outside bar, including
        // one that just confirmed a swing low.
        if matches!(kinds[i], BarKind::Up | BarKind::Outside)
            && lows[right_idx] < current_low
            && matches!(last_swing, None | Some(SwingKind::Low))
        {
            last_swing = Some(SwingKind::High);
        }
    }

    is_swing_low
}

/// Build the chronological swing-event list from the two boolean series.
///
/// A bar that is both a swing high and a swing low (outside-bar case)
/// contributes two events whose order depends on the swing state before
/// that bar: coming off a low the high prints first (continuation, then
/// reversal); otherwise the low prints first.
pub fn swing_events<T: OHLCV>(
    bars: &[T],
    is_swing_high: &[bool],
    is_swing_low: &[bool],
) -> Vec<SwingPoint> {
    let mut events = Vec::new();
    let mut last_kind: Option<SwingKind> = None;

    for (i, bar) in bars.iter().enumerate() {
        let hi = is_swing_high.get(i).copied().unwrap_or(false);
        let lo = is_swing_low.get(i).copied().unwrap_or(false);

        match (hi, lo) {
            (true, true) => {
                if last_kind == Some(SwingKind::Low) {
                    events.push(SwingPoint {
                        bar: i,
                        kind: SwingKind::High,
                        price: bar.high(),
                    });
                    events.push(SwingPoint {
                        bar: i,
                        kind: SwingKind::Low,
                        price: bar.low(),
                    });
                    last_kind = Some(SwingKind::Low);
                } else {
                    events.push(SwingPoint {
                        bar: i,
                        kind: SwingKind::Low,
                        price: bar.low(),
                    });
                    events.push(SwingPoint {
                        bar: i,
                        kind: SwingKind::High,
                        price: bar.high(),
                    });
                    last_kind = Some(SwingKind::High);
                }
            }
            (false, true) => {
                events.push(SwingPoint {
                    bar: i,
                    kind: SwingKind::Low,
                    price: bar.low(),
                });
                last_kind = Some(SwingKind::Low);
            }
            (true, false) => {
                events.push(SwingPoint {
                    bar: i,
                    kind: SwingKind::High,
                    price: bar.high(),
                });
                last_kind = Some(SwingKind::High);
            }
            (false, false) => {}
        }
    }

    events
}
