//! Holding-period outcome measurement for signal validation.
//!
//! For every bar where a signal fired, measures what price did over the
//! following holding period (52 weekly bars by default): the terminal
//! return, the maximum favourable and adverse excursions, and, when an
//! exit-signal series is supplied, how exiting on signal compares to
//! holding.
//!
//! A `true` at bar `i` is treated as a decision made with data available
//! through bar `i`; entry is at that bar's close and all measurement is
//! strictly forward from there.

use crate::{Period, OHLCV};

/// Outcome metrics for a single signal instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalOutcome {
    /// Bar where the signal fired.
    pub signal_bar: usize,
    /// Close of the signal bar.
    pub entry_price: f64,

    /// % return at the end of the holding period.
    pub return_pct: f64,
    /// Was the holding-period return positive?
    pub profitable: bool,
    /// Close at the end of the holding period.
    pub end_price: f64,

    /// Max favourable excursion: peak % gain, measured on highs.
    pub mfe_pct: f64,
    /// Offset within the window where the peak occurred.
    pub mfe_bar: usize,
    pub mfe_price: f64,
    /// Max adverse excursion: worst % drawdown, measured on lows.
    pub mae_pct: f64,
    /// Offset within the window where the trough occurred.
    pub mae_bar: usize,
    pub mae_price: f64,

    /// Offset of the first exit signal within the window, if any fired.
    pub exit_bar: Option<usize>,
    /// % return if exited on the exit signal's close.
    pub return_at_exit: Option<f64>,

    /// `mfe_pct - return_pct`: gain given back by holding to the end.
    pub left_on_table: f64,
    /// `return_at_exit - return_pct`.
    pub exit_vs_hold: Option<f64>,
    /// `return_at_exit - mfe_pct`.
    pub exit_vs_mfe: Option<f64>,
}

/// Aggregate statistics over a set of outcomes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutcomeSummary {
    pub total_signals: usize,
    /// % of signals with a positive holding-period return.
    pub win_rate: f64,
    pub mean_return: f64,
    pub median_return: f64,
    pub std_return: f64,
    pub mean_mfe: f64,
    pub mean_mae: f64,
    pub mean_left_on_table: f64,
    /// % of signals where an exit signal fired inside the window.
    pub exit_fired_rate: f64,
    /// % of fired exits that beat holding to the end.
    pub exit_useful_rate: Option<f64>,
    pub mean_exit_vs_hold: Option<f64>,
}

/// Measures holding-period outcomes for entry signals.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeMeasurer {
    holding_period: Period,
}

impl Default for OutcomeMeasurer {
    fn default() -> Self {
        // 52 weekly bars = 12 months.
        Self {
            holding_period: Period::new_const(52),
        }
    }
}

impl OutcomeMeasurer {
    pub fn new(holding_period: Period) -> Self {
        Self { holding_period }
    }

    pub fn holding_period(&self) -> usize {
        self.holding_period.get()
    }

    /// Measure the outcome of a single signal instance.
    ///
    /// Returns `None` when fewer than `holding_period` bars of forward
    /// data exist; an unmeasurable signal is skipped, never an error.
    pub fn measure_single<T: OHLCV>(
        &self,
        bars: &[T],
        signal_bar: usize,
        exit_signals: Option<&[bool]>,
    ) -> Option<SignalOutcome> {
        let period = self.holding_period.get();
        let end_bar = signal_bar + period;
        if end_bar >= bars.len() {
            return None;
        }

        let entry_price = bars[signal_bar].close();
        let window = &bars[signal_bar..=end_bar];

        let end_price = window[window.len() - 1].close();
        let return_pct = (end_price - entry_price) / entry_price * 100.0;

        let mut mfe_bar = 0;
        let mut mfe_price = window[0].high();
        let mut mae_bar = 0;
        let mut mae_price = window[0].low();
        for (offset, bar) in window.iter().enumerate() {
            if bar.high() > mfe_price {
                mfe_price = bar.high();
                mfe_bar = offset;
            }
            if bar.low() < mae_price {
                mae_price = bar.low();
                mae_bar = offset;
            }
        }
        let mfe_pct = (mfe_price - entry_price) / entry_price * 100.0;
        let mae_pct = (mae_price - entry_price) / entry_price * 100.0;

        let mut exit_bar = None;
        let mut return_at_exit = None;
        if let Some(exits) = exit_signals {
            let stop = (end_bar + 1).min(exits.len());
            if let Some(first_exit) =
                (signal_bar + 1..stop).find(|&i| exits[i])
            {
                exit_bar = Some(first_exit - signal_bar);
                let exit_price = bars[first_exit].close();
                return_at_exit = Some((exit_price - entry_price) / entry_price * 100.0);
            }
        }

        Some(SignalOutcome {
            signal_bar,
            entry_price,
            return_pct,
            profitable: return_pct > 0.0,
            end_price,
            mfe_pct,
            mfe_bar,
            mfe_price,
            mae_pct,
            mae_bar,
            mae_price,
            exit_bar,
            return_at_exit,
            left_on_table: mfe_pct - return_pct,
            exit_vs_hold: return_at_exit.map(|r| r - return_pct),
            exit_vs_mfe: return_at_exit.map(|r| r - mfe_pct),
        })
    }

    /// Measure outcomes for every `true` in a signal series.
    pub fn measure_all<T: OHLCV>(
        &self,
        bars: &[T],
        signals: &[bool],
        exit_signals: Option<&[bool]>,
    ) -> Vec<SignalOutcome> {
        signals
            .iter()
            .enumerate()
            .filter(|&(_, &fired)| fired)
            .filter_map(|(bar, _)| self.measure_single(bars, bar, exit_signals))
            .collect()
    }

    /// Aggregate statistics across outcomes. Returns `None` for an empty
    /// input, since none of the ratios are defined.
    pub fn summarize(&self, outcomes: &[SignalOutcome]) -> Option<OutcomeSummary> {
        if outcomes.is_empty() {
            return None;
        }

        let total = outcomes.len();
        let total_f = total as f64;
        let wins = outcomes.iter().filter(|o| o.profitable).count();

        let mean = |f: fn(&SignalOutcome) -> f64| -> f64 {
            outcomes.iter().map(f).sum::<f64>() / total_f
        };

        let mean_return = mean(|o| o.return_pct);
        let variance = outcomes
            .iter()
            .map(|o| {
                let d = o.return_pct - mean_return;
                d * d
            })
            .sum::<f64>()
            / total_f;

        let mut sorted_returns: Vec<f64> = outcomes.iter().map(|o| o.return_pct).collect();
        sorted_returns.sort_by(|a, b| a.total_cmp(b));
        let median_return = if total % 2 == 1 {
            sorted_returns[total / 2]
        } else {
            (sorted_returns[total / 2 - 1] + sorted_returns[total / 2]) / 2.0
        };

        let exits: Vec<&SignalOutcome> =
            outcomes.iter().filter(|o| o.exit_bar.is_some()).collect();
        let (exit_useful_rate, mean_exit_vs_hold) = if exits.is_empty() {
            (None, None)
        } else {
            let useful = exits
                .iter()
                .filter(|o| o.exit_vs_hold.map_or(false, |d| d > 0.0))
                .count();
            let mean_dv = exits
                .iter()
                .filter_map(|o| o.exit_vs_hold)
                .sum::<f64>()
                / exits.len() as f64;
            (
                Some(useful as f64 / exits.len() as f64 * 100.0),
                Some(mean_dv),
            )
        };

        Some(OutcomeSummary {
            total_signals: total,
            win_rate: wins as f64 / total_f * 100.0,
            mean_return,
            median_return,
            std_return: variance.sqrt(),
            mean_mfe: mean(|o| o.mfe_pct),
            mean_mae: mean(|o| o.mae_pct),
            mean_left_on_table: mean(|o| o.left_on_table),
            exit_fired_rate: exits.len() as f64 / total_f * 100.0,
            exit_useful_rate,
            mean_exit_vs_hold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn flat_then_trend(n: usize, start: f64, step: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = start + step * i as f64;
                Bar::new(c, c + 1.0, c - 1.0, c)
            })
            .collect()
    }

    #[test]
    fn test_measure_single_uptrend() {
        // Close rises 1.0/bar from 100; entry at bar 2 close = 102.
        let bars = flat_then_trend(60, 100.0, 1.0);
        let m = OutcomeMeasurer::new(Period::new(10).unwrap());
        let o = m.measure_single(&bars, 2, None).unwrap();

        assert_eq!(o.entry_price, 102.0);
        assert_eq!(o.end_price, 112.0);
        assert!((o.return_pct - 10.0 / 102.0 * 100.0).abs() < 1e-9);
        assert!(o.profitable);
        // Peak high is the last bar's close + 1.
        assert_eq!(o.mfe_bar, 10);
        assert_eq!(o.mfe_price, 113.0);
        // Worst low is the entry bar's close - 1.
        assert_eq!(o.mae_bar, 0);
        assert_eq!(o.mae_price, 101.0);
        assert!(o.left_on_table > 0.0);
    }

    #[test]
    fn test_measure_single_insufficient_forward_data() {
        let bars = flat_then_trend(30, 100.0, 1.0);
        let m = OutcomeMeasurer::default(); // 52-bar holding period
        assert!(m.measure_single(&bars, 2, None).is_none());
    }

    #[test]
    fn test_exit_signal_interaction() {
        let bars = flat_then_trend(30, 100.0, 1.0);
        let m = OutcomeMeasurer::new(Period::new(10).unwrap());

        let mut exits = vec![false; 30];
        exits[5] = true;
        exits[8] = true; // only the first exit in the window counts

        let o = m.measure_single(&bars, 2, Some(&exits)).unwrap();
        assert_eq!(o.exit_bar, Some(3));
        // Exit close = 105, entry = 102.
        let expected = 3.0 / 102.0 * 100.0;
        assert!((o.return_at_exit.unwrap() - expected).abs() < 1e-9);
        assert!(o.exit_vs_hold.unwrap() < 0.0); // exited into a rally
    }

    #[test]
    fn test_exit_on_signal_bar_is_ignored() {
        let bars = flat_then_trend(30, 100.0, 1.0);
        let m = OutcomeMeasurer::new(Period::new(10).unwrap());

        let mut exits = vec![false; 30];
        exits[2] = true; // same bar as entry: not an exit

        let o = m.measure_single(&bars, 2, Some(&exits)).unwrap();
        assert_eq!(o.exit_bar, None);
    }

    #[test]
    fn test_measure_all_skips_unmeasurable_tail() {
        let bars = flat_then_trend(30, 100.0, 1.0);
        let m = OutcomeMeasurer::new(Period::new(10).unwrap());

        let mut signals = vec![false; 30];
        signals[2] = true;
        signals[25] = true; // too close to the end

        let outcomes = m.measure_all(&bars, &signals, None);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].signal_bar, 2);
    }

    #[test]
    fn test_summarize() {
        let bars = flat_then_trend(60, 100.0, 1.0);
        let m = OutcomeMeasurer::new(Period::new(10).unwrap());

        let mut signals = vec![false; 60];
        signals[2] = true;
        signals[10] = true;

        let outcomes = m.measure_all(&bars, &signals, None);
        let summary = m.summarize(&outcomes).unwrap();
        assert_eq!(summary.total_signals, 2);
        assert_eq!(summary.win_rate, 100.0);
        assert_eq!(summary.exit_fired_rate, 0.0);
        assert!(summary.exit_useful_rate.is_none());

        assert!(m.summarize(&[]).is_none());
    }
}
