//! Downtrend trendline break engine.
//!
//! Three-state machine:
//!
//! 1. `WaitingForDowntrend`: a bearish 1-2-3 breakdown confirms the
//!    downtrend; the highest swing high inside the lookback window before
//!    the breakdown bar becomes the turning point.
//! 2. `CollectingPeaks`: strictly descending swing highs accumulate until
//!    a line through them validates against every bar in span.
//! 3. `WatchingForBreak`: the signal fires on the first bar whose high
//!    clears the projected line by more than the break threshold.
//!
//! A high above the turning point invalidates the structure at any stage.
//! Resuming a pattern from its original turning point after a false break
//! is not implemented: a confirmed break always fully resets the machine.

use std::collections::HashMap;

use super::breakout::Dow123BearishBreakdown;
use crate::params::{get_percent, get_period, ParamMeta, ParameterizedSignal};
use crate::swings::swing_highs;
use crate::trendline::{Peak, TrendLine};
use crate::{Percent, Period, Result, SignalError, SignalGenerator, SignalId, OHLCV};

/// Configuration for [`DowntrendLineBreak`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LineBreakConfig {
    /// Maximum % deviation allowed for peaks and bars against the line.
    pub tolerance_pct: Percent,
    /// Minimum peaks (turning point included) for a valid line.
    pub min_peaks: usize,
    /// Penetration % required to trigger the break signal.
    pub break_threshold_pct: Percent,
    /// How far back the turning point may be sought before the breakdown
    /// bar. `None` searches all prior swing highs.
    pub turning_point_lookback: Option<Period>,
    /// Pivot to a steeper line when price breaks below the current one.
    pub track_acceleration: bool,
}

impl Default for LineBreakConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: Percent::new_const(2.0),
            min_peaks: 3,
            break_threshold_pct: Percent::new_const(2.0),
            turning_point_lookback: Some(Period::new_const(52)),
            track_acceleration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    WaitingForDowntrend,
    CollectingPeaks,
    WatchingForBreak,
}

/// Entry signal on a validated break above a downtrend trendline.
#[derive(Debug, Clone, Default)]
pub struct DowntrendLineBreak {
    config: LineBreakConfig,
}

impl DowntrendLineBreak {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn with_config(config: LineBreakConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LineBreakConfig {
        &self.config
    }

    /// Highest swing high before `breakdown_bar`, restricted to the
    /// lookback window when one is configured. Ties keep the earliest.
    fn find_turning_point(&self, swing_highs: &[Peak], breakdown_bar: usize) -> Option<Peak> {
        let window_start = self
            .config
            .turning_point_lookback
            .map_or(0, |lb| breakdown_bar.saturating_sub(lb.get()));

        swing_highs
            .iter()
            .filter(|&&(bar, _)| bar < breakdown_bar && bar >= window_start)
            .fold(None, |best: Option<Peak>, &peak| match best {
                Some(b) if peak.1 <= b.1 => Some(b),
                _ => Some(peak),
            })
    }
}

impl SignalGenerator for DowntrendLineBreak {
    fn id(&self) -> SignalId {
        SignalId("DOWNTREND_LINE_BREAK")
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.min_peaks < 2 {
            return Err(SignalError::InvalidValue(
                "min_peaks must be at least 2 to define a line",
            ));
        }
        Ok(())
    }

    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let n = bars.len();
        let mut signal = vec![false; n];

        let tolerance = self.config.tolerance_pct.get();
        let threshold = self.config.break_threshold_pct.get();

        let bearish = Dow123BearishBreakdown::with_defaults().generate(bars);
        let is_swing_high = swing_highs(bars);

        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        let mut state = LineState::WaitingForDowntrend;
        let mut turning_point: Option<Peak> = None;
        let mut peaks: Vec<Peak> = Vec::new();
        let mut current_line: Option<TrendLine> = None;
        let mut last_steepen_bar: Option<usize> = None;

        // Every swing high seen so far, for the turning-point search.
        let mut recent_swing_highs: Vec<Peak> = Vec::new();

        for i in 0..n {
            if is_swing_high[i] {
                recent_swing_highs.push((i, highs[i]));
            }

            match state {
                LineState::WaitingForDowntrend => {
                    if bearish[i] {
                        turning_point = self.find_turning_point(&recent_swing_highs, i);
                        if let Some(tp) = turning_point {
                            state = LineState::CollectingPeaks;
                            peaks = vec![tp];
                            current_line = None;
                        }
                    }
                }

                LineState::CollectingPeaks => {
                    if is_swing_high[i] {
                        let peak_price = highs[i];
                        let last_peak_price = peaks.last().map(|p| p.1);

                        if last_peak_price.map_or(false, |last| peak_price < last) {
                            peaks.push((i, peak_price));

                            if peaks.len() >= self.config.min_peaks {
                                if let Some(candidate) = TrendLine::from_peaks(&peaks, tolerance) {
                                    if candidate.validate_bars(&highs, peaks[0].0, i, tolerance) {
                                        current_line = Some(candidate);
                                        state = LineState::WatchingForBreak;
                                    }
                                }
                            }
                        } else {
                            // A higher high breaks the downtrend structure.
                            state = LineState::WaitingForDowntrend;
                            turning_point = None;
                            peaks.clear();
                            current_line = None;
                        }
                    }

                    if turning_point.map_or(false, |(_, tp_price)| highs[i] > tp_price) {
                        state = LineState::WaitingForDowntrend;
                        turning_point = None;
                        peaks.clear();
                        current_line = None;
                    }
                }

                LineState::WatchingForBreak => {
                    let Some(line) = current_line.clone() else {
                        state = LineState::WaitingForDowntrend;
                        continue;
                    };

                    if line.is_break_above(i, highs[i], threshold) {
                        // First-bar rule: the previous bar must not have
                        // been beyond the projected threshold already.
                        let mut is_first_break = true;
                        if i > 0 {
                            let prev_line_price = line.price_at_bar(i - 1);
                            let prev_threshold = prev_line_price * (1.0 + threshold / 100.0);
                            if highs[i - 1] > prev_threshold {
                                is_first_break = false;
                            }
                        }

                        if is_first_break {
                            signal[i] = true;
                            state = LineState::WaitingForDowntrend;
                            turning_point = None;
                            peaks.clear();
                            current_line = None;
                            last_steepen_bar = None;
                            continue;
                        }
                    }

                    // A new lower swing high may steepen the line.
                    if is_swing_high[i] {
                        let peak_price = highs[i];
                        if peaks.last().map_or(false, |&(_, last)| peak_price < last) {
                            if let Some(steeper) = line.try_steepen((i, peak_price), tolerance) {
                                if steeper.validate_bars(&highs, steeper.peaks[0].0, i, tolerance)
                                {
                                    peaks.push((i, peak_price));
                                    current_line = Some(steeper);
                                    last_steepen_bar = Some(i);
                                    // The new line passes through this bar's
                                    // peak; nothing else to check here.
                                    continue;
                                }
                            }
                        }
                    }

                    // Acceleration requires a fresh peak since the last
                    // steepening before it may pivot again.
                    let has_new_peak_since_steepen = last_steepen_bar
                        .map_or(true, |s| peaks[1..].iter().any(|&(bar, _)| bar > s));

                    if self.config.track_acceleration
                        && has_new_peak_since_steepen
                        && line.is_break_below(i, lows[i], threshold)
                        && peaks.len() >= 2
                    {
                        // Price is falling away from the line; restart the
                        // collection from the most recent peak.
                        if let Some(&last_peak) = peaks.last() {
                            turning_point = Some(last_peak);
                            peaks = vec![last_peak];
                            current_line = None;
                            state = LineState::CollectingPeaks;
                        }
                    }

                    if turning_point.map_or(false, |(_, tp_price)| highs[i] > tp_price) {
                        state = LineState::WaitingForDowntrend;
                        turning_point = None;
                        peaks.clear();
                        current_line = None;
                    }
                }
            }
        }

        signal
    }
}

impl ParameterizedSignal for DowntrendLineBreak {
    fn param_meta() -> &'static [ParamMeta] {
        static META: [ParamMeta; 4] = [
            ParamMeta::percent(
                "tolerance_pct",
                2.0,
                (0.5, 5.0, 0.5),
                "Maximum % deviation of peaks and bars from the line",
            ),
            ParamMeta::period(
                "min_peaks",
                3.0,
                (2.0, 5.0, 1.0),
                "Minimum peaks required for a valid line",
            ),
            ParamMeta::percent(
                "break_threshold_pct",
                2.0,
                (0.5, 5.0, 0.5),
                "Penetration % required to trigger the break",
            ),
            ParamMeta::period(
                "turning_point_lookback",
                52.0,
                (13.0, 104.0, 13.0),
                "Bars searched back for the turning point; 0 disables the window",
            ),
        ];
        &META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let tolerance_pct = get_percent(params, "tolerance_pct", 2.0)?;
        let break_threshold_pct = get_percent(params, "break_threshold_pct", 2.0)?;
        let min_peaks = get_period(params, "min_peaks", 3)?.get();

        let lookback_raw = params
            .get("turning_point_lookback")
            .copied()
            .unwrap_or(52.0);
        let turning_point_lookback = if lookback_raw == 0.0 {
            None
        } else {
            Some(Period::new(lookback_raw as usize)?)
        };

        Ok(Self::with_config(LineBreakConfig {
            tolerance_pct,
            min_peaks,
            break_threshold_pct,
            turning_point_lookback,
            track_acceleration: false,
        }))
    }

    fn signal_id_str() -> &'static str {
        "DOWNTREND_LINE_BREAK"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bar(h: f64, l: f64) -> Bar {
        Bar::new((h + l) / 2.0, h, l, (h + l) / 2.0)
    }

    /// Turning point at bar 3 (106), bearish breakdown at bar 10, lower
    /// swing highs at 14 (100.5) and 18 (98.5) exactly on the slope -0.5
    /// line from the turning point, then a break at bar 21 (line is at
    /// 97.0, threshold 98.94, high 100.0).
    fn downtrend_with_line_break() -> Vec<Bar> {
        vec![
            bar(100.0, 98.0),  // 0 reference
            bar(102.0, 99.0),  // 1 up
            bar(104.0, 101.0), // 2 up
            bar(106.0, 103.0), // 3 up    <- turning point swing high @ 106
            bar(104.5, 101.5), // 4 down
            bar(103.0, 100.0), // 5 down
            bar(101.5, 98.5),  // 6 down  <- swing low @ 98.5
            bar(103.5, 99.5),  // 7 up
            bar(104.8, 101.0), // 8 up    <- lower swing high @ 104.8
            bar(103.0, 99.8),  // 9 down
            bar(101.0, 98.0),  // 10 down: low 98 < 98.5, breakdown fires
            bar(99.5, 96.8),   // 11 down <- swing low @ 96.8
            bar(100.0, 97.5),  // 12 up
            bar(100.3, 98.0),  // 13 up
            bar(100.5, 98.3),  // 14 up   <- peak 2 @ 100.5 (line: 100.5)
            bar(99.0, 97.0),   // 15 down
            bar(98.2, 96.0),   // 16 down <- swing low @ 96.0
            bar(98.4, 96.5),   // 17 up
            bar(98.5, 96.8),   // 18 up   <- peak 3 @ 98.5 (line: 98.5)
            bar(97.5, 95.5),   // 19 down
            bar(96.5, 94.5),   // 20 down
            bar(100.0, 95.0),  // 21 up: high 100 > 98.94, break signal
            bar(101.0, 98.0),  // 22 up
        ]
    }

    #[test]
    fn test_line_break_fires_after_three_peaks() {
        let signal = DowntrendLineBreak::with_defaults().generate(&downtrend_with_line_break());
        let fired: Vec<usize> = (0..signal.len()).filter(|&i| signal[i]).collect();
        assert_eq!(fired, vec![21]);
    }

    #[test]
    fn test_no_signal_without_downtrend() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| bar(100.0 + 2.0 * i as f64, 98.0 + 2.0 * i as f64))
            .collect();
        let signal = DowntrendLineBreak::with_defaults().generate(&bars);
        assert!(!signal.iter().any(|&s| s));
    }

    #[test]
    fn test_no_signal_with_only_two_peaks() {
        // Truncate before the third peak can confirm: the machine stays
        // in peak collection and never watches for a break.
        let bars = &downtrend_with_line_break()[..18];
        let signal = DowntrendLineBreak::with_defaults().generate(bars);
        assert!(!signal.iter().any(|&s| s));
    }

    #[test]
    fn test_high_above_turning_point_invalidates() {
        let mut bars = downtrend_with_line_break();
        // Bar 17 spikes above the turning point (106) before a line forms.
        bars[17] = bar(107.0, 96.5);
        let signal = DowntrendLineBreak::with_defaults().generate(&bars);
        assert!(!signal.iter().any(|&s| s));
    }

    #[test]
    fn test_acceleration_pivot_restarts_collection() {
        // With acceleration tracking on, bar 19's low (95.5 vs line 98.0,
        // 2.55% below) pivots collection to the last peak, and the bar-21
        // rally then breaks the new turning point instead of signalling.
        let engine = DowntrendLineBreak::with_config(LineBreakConfig {
            track_acceleration: true,
            ..LineBreakConfig::default()
        });
        let signal = engine.generate(&downtrend_with_line_break());
        assert!(!signal.iter().any(|&s| s));
    }

    #[test]
    fn test_with_params_roundtrip() {
        let mut params = HashMap::new();
        params.insert("tolerance_pct", 3.0);
        params.insert("turning_point_lookback", 0.0);
        let engine = DowntrendLineBreak::with_params(&params).unwrap();
        assert_eq!(engine.config().tolerance_pct.get(), 3.0);
        assert!(engine.config().turning_point_lookback.is_none());
        assert_eq!(engine.config().min_peaks, 3);
    }

    #[test]
    fn test_validate_config_rejects_degenerate_min_peaks() {
        let engine = DowntrendLineBreak::with_config(LineBreakConfig {
            min_peaks: 1,
            ..LineBreakConfig::default()
        });
        assert!(engine.validate_config().is_err());
    }
}
