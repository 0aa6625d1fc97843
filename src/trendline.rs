//! Downtrend trendline geometry.
//!
//! A [`TrendLine`] connects two or more strictly descending swing-high
//! peaks. The line runs from the first peak (the turning point) to the
//! last; every intermediate peak, and every bar high in a validated span,
//! must stay within a tolerance percentage of the line's projected price.

/// A peak: `(bar_index, price)`.
pub type Peak = (usize, f64);

/// A line through descending swing-high peaks, with negative slope.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendLine {
    /// Bar index of the first peak (turning point).
    pub start_bar: usize,
    /// Price at the first peak.
    pub start_price: f64,
    /// Bar index of the last peak used for the slope.
    pub end_bar: usize,
    /// Price at the last peak.
    pub end_price: f64,
    /// Price change per bar; negative for a downtrend.
    pub slope: f64,
    /// All peaks the line was fit through, in chronological order.
    pub peaks: Vec<Peak>,
}

impl TrendLine {
    /// Fit a line through `peaks`, drawn from the first to the last.
    ///
    /// Requires at least two peaks, strictly descending prices, and a
    /// negative slope; every intermediate peak must deviate at most
    /// `tolerance_pct` from the line. Returns `None` otherwise.
    pub fn from_peaks(peaks: &[Peak], tolerance_pct: f64) -> Option<Self> {
        if peaks.len() < 2 {
            return None;
        }

        for pair in peaks.windows(2) {
            if pair[1].1 >= pair[0].1 {
                return None;
            }
        }

        let (start_bar, start_price) = peaks[0];
        let (end_bar, end_price) = peaks[peaks.len() - 1];

        if end_bar == start_bar {
            return None;
        }

        let slope = (end_price - start_price) / (end_bar as f64 - start_bar as f64);
        if slope >= 0.0 {
            return None;
        }

        let line = Self {
            start_bar,
            start_price,
            end_bar,
            end_price,
            slope,
            peaks: peaks.to_vec(),
        };

        // The first and last peak define the line; only the interior
        // peaks can deviate.
        for &(bar, price) in &peaks[1..peaks.len() - 1] {
            if line.deviation_pct(bar, price) > tolerance_pct {
                return None;
            }
        }

        Some(line)
    }

    /// Projected line price at `bar`, extrapolating linearly from the
    /// turning point.
    #[inline]
    pub fn price_at_bar(&self, bar: usize) -> f64 {
        self.start_price + self.slope * (bar as f64 - self.start_bar as f64)
    }

    /// Absolute percentage deviation of `price` from the line at `bar`.
    pub fn deviation_pct(&self, bar: usize, price: f64) -> f64 {
        let line_price = self.price_at_bar(bar);
        if line_price == 0.0 {
            return f64::INFINITY;
        }
        ((price - line_price) / line_price).abs() * 100.0
    }

    /// True when `high` penetrates the line upward by strictly more than
    /// `threshold_pct`.
    pub fn is_break_above(&self, bar: usize, high: f64, threshold_pct: f64) -> bool {
        let line_price = self.price_at_bar(bar);
        if high <= line_price {
            return false;
        }
        (high - line_price) / line_price * 100.0 > threshold_pct
    }

    /// True when `low` penetrates the line downward by strictly more than
    /// `threshold_pct`. For a downtrend this indicates acceleration.
    pub fn is_break_below(&self, bar: usize, low: f64, threshold_pct: f64) -> bool {
        let line_price = self.price_at_bar(bar);
        if low >= line_price {
            return false;
        }
        (line_price - low) / line_price * 100.0 > threshold_pct
    }

    /// Check that no bar high in `start..=end` penetrates the line by more
    /// than `tolerance_pct`. The range is clamped to the series length.
    pub fn validate_bars(
        &self,
        highs: &[f64],
        start: usize,
        end: usize,
        tolerance_pct: f64,
    ) -> bool {
        let stop = (end + 1).min(highs.len());
        for (bar, &high) in highs.iter().enumerate().take(stop).skip(start) {
            let line_price = self.price_at_bar(bar);
            if high > line_price && (high - line_price) / line_price * 100.0 > tolerance_pct {
                return false;
            }
        }
        true
    }

    /// Attempt a steeper line that includes `new_peak`.
    ///
    /// The new peak must be later and lower than every existing peak and
    /// the resulting slope strictly more negative; the candidate is rebuilt
    /// through [`from_peaks`](Self::from_peaks) so the full peak set is
    /// re-validated. Returns `None` when no steeper valid line exists.
    pub fn try_steepen(&self, new_peak: Peak, tolerance_pct: f64) -> Option<Self> {
        let (new_bar, new_price) = new_peak;

        if let Some(&(_, last_price)) = self.peaks.last() {
            if new_price >= last_price {
                return None;
            }
        }

        if new_bar <= self.end_bar {
            return None;
        }

        let new_slope = (new_price - self.start_price) / (new_bar as f64 - self.start_bar as f64);
        if new_slope >= self.slope {
            return None;
        }

        let mut new_peaks = self.peaks.clone();
        new_peaks.push(new_peak);
        Self::from_peaks(&new_peaks, tolerance_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_peaks_three_descending() {
        let peaks = [(0, 100.0), (10, 95.0), (20, 90.0)];
        let line = TrendLine::from_peaks(&peaks, 2.0).unwrap();
        assert_eq!(line.start_bar, 0);
        assert_eq!(line.end_bar, 20);
        assert!((line.slope - (-0.5)).abs() < 1e-12);
        assert_eq!(line.peaks.len(), 3);
    }

    #[test]
    fn test_from_peaks_rejects_single_and_ascending() {
        assert!(TrendLine::from_peaks(&[(0, 100.0)], 2.0).is_none());
        assert!(TrendLine::from_peaks(&[(0, 100.0), (10, 95.0), (20, 97.0)], 2.0).is_none());
        assert!(TrendLine::from_peaks(&[(0, 100.0), (10, 95.0), (20, 95.0)], 2.0).is_none());
    }

    #[test]
    fn test_from_peaks_intermediate_tolerance() {
        // Line (0,100)-(20,90): price at bar 10 is 95. A middle peak at 91
        // deviates ~4.2%, at 94 only ~1.05%.
        assert!(TrendLine::from_peaks(&[(0, 100.0), (10, 91.0), (20, 90.0)], 2.0).is_none());
        assert!(TrendLine::from_peaks(&[(0, 100.0), (10, 94.0), (20, 90.0)], 2.0).is_some());
    }

    #[test]
    fn test_price_at_bar_interpolates_and_extrapolates() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 90.0)], 5.0).unwrap();
        assert_eq!(line.price_at_bar(0), 100.0);
        assert_eq!(line.price_at_bar(10), 90.0);
        assert_eq!(line.price_at_bar(5), 95.0);
        assert_eq!(line.price_at_bar(15), 85.0);
    }

    #[test]
    fn test_break_above_strict_threshold() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 95.0), (20, 90.0)], 2.0).unwrap();
        // Line price at bar 5 is 97.5; 2% above is 99.45.
        assert!(!line.is_break_above(5, 99.4, 2.0));
        assert!(line.is_break_above(5, 99.6, 2.0));
        assert!(!line.is_break_above(5, 90.0, 2.0));
    }

    #[test]
    fn test_break_below() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 90.0)], 5.0).unwrap();
        // Line price at bar 5 is 95; 2% below is 93.1.
        assert!(!line.is_break_below(5, 94.0, 2.0));
        assert!(line.is_break_below(5, 92.0, 2.0));
    }

    #[test]
    fn test_validate_bars() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 90.0)], 5.0).unwrap();
        let ok = [98.0, 97.0, 96.0, 95.0, 94.0, 93.0, 92.0, 91.0, 90.0, 89.0, 88.0];
        assert!(line.validate_bars(&ok, 0, 10, 2.0));

        let mut bad = ok;
        bad[5] = 99.0; // line at bar 5 is 95, 99 is ~4.2% above
        assert!(!line.validate_bars(&bad, 0, 10, 2.0));
    }

    #[test]
    fn test_validate_bars_clamps_range() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 90.0)], 5.0).unwrap();
        let highs = [98.0, 97.0, 96.0];
        assert!(line.validate_bars(&highs, 0, 50, 2.0));
    }

    #[test]
    fn test_try_steepen() {
        let line = TrendLine::from_peaks(&[(0, 100.0), (10, 95.0)], 5.0).unwrap();

        let steeper = line.try_steepen((20, 85.0), 5.0).unwrap();
        assert!(steeper.slope < line.slope);
        assert_eq!(steeper.peaks.len(), 3);

        // Not lower than the last peak.
        assert!(line.try_steepen((20, 97.0), 5.0).is_none());
        // Not later than the current end.
        assert!(line.try_steepen((10, 93.0), 5.0).is_none());
        // Lower and later, but shallower: (20, 91.0) gives slope -0.45.
        assert!(line.try_steepen((20, 91.0), 5.0).is_none());
    }
}
