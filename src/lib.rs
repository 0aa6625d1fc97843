//! # dowsig - Dow Theory structure signals
//!
//! Detection of Dow Theory swing and breakout structures from weekly OHLC
//! bars: bar classification, alternating swing points, and the pattern
//! engines built on top of them (1-2-3 breakout/breakdown, downtrend
//! reversal, twelve-bar consolidation breakout, downtrend trendline break).
//!
//! ## Quick Start
//!
//! ```rust
//! use dowsig::prelude::*;
//!
//! // Define your OHLC data
//! struct Bar { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! // Create engine with all builtin signals
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .build()
//!     .unwrap();
//!
//! // Scan your data: one boolean series per signal engine
//! let bars: Vec<Bar> = vec![];
//! let series = engine.scan(&bars).unwrap();
//! ```

pub mod bars;
pub mod outcomes;
pub mod params;
pub mod signals;
pub mod swings;
pub mod trendline;

pub mod prelude {
    pub use crate::{
        // Bar classification
        bars::{classify_bars, is_down_bar, is_inside_bar, is_outside_bar, is_up_bar, BarKind},
        // Columnar ingestion
        bars_from_columns,
        // Outcome measurement
        outcomes::{OutcomeMeasurer, OutcomeSummary, SignalOutcome},
        // Parameters
        params::{get_percent, get_period, ParamMeta, ParamType, ParameterizedSignal},
        // Parallel
        scan_parallel,
        // Engines
        signals::*,
        // Swing detection
        swings::{swing_events, swing_highs, swing_lows, SwingKind, SwingPoint},
        // Trendline geometry
        trendline::{Peak, TrendLine},
        Bar,
        BuiltinSignal,
        Direction,
        // Core traits
        DynSignalGenerator,
        EngineBuilder,
        OHLCVExt,
        Percent,
        Period,
        Result,
        ScanError,
        ScanResult,
        SignalEngine,
        // Errors
        SignalError,
        SignalGenerator,
        SignalId,
        SignalSeries,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors that can occur during signal generation and configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    #[error("Missing required column: {column}")]
    MissingColumn { column: &'static str },

    #[error("Column {column} has length {got}, expected {expected}")]
    ColumnLengthMismatch {
        column: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// A percentage value (finite, >= 0). Percentages here are expressed the
/// way chartists quote them: `2.0` means two percent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    /// Create a new Percent, validating the value is finite and >= 0
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SignalError::InvalidValue(
                "Percent cannot be NaN or infinite",
            ));
        }
        if value < 0.0 {
            return Err(SignalError::OutOfRange {
                field: "Percent",
                value,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self(value))
    }

    /// Create a Percent from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SignalError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLC data trait
///
/// The engines read only High, Low and Close; Open is carried for
/// completeness and for downstream consumers.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Blanket impl for references to dyn OHLCV
impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Validate OHLC data consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// OWNED BAR + COLUMNAR INGESTION
// ============================================================

/// Plain owned OHLC record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

/// Assemble bars from columnar data.
///
/// All four columns are required and must have equal, non-zero length.
/// This is where loader output meets the engine contract: a missing
/// column surfaces as [`SignalError::MissingColumn`] before any engine
/// runs.
pub fn bars_from_columns(
    open: Option<&[f64]>,
    high: Option<&[f64]>,
    low: Option<&[f64]>,
    close: Option<&[f64]>,
) -> Result<Vec<Bar>> {
    let open = open.ok_or(SignalError::MissingColumn { column: "Open" })?;
    let high = high.ok_or(SignalError::MissingColumn { column: "High" })?;
    let low = low.ok_or(SignalError::MissingColumn { column: "Low" })?;
    let close = close.ok_or(SignalError::MissingColumn { column: "Close" })?;

    let expected = open.len();
    for (column, col) in [("High", high), ("Low", low), ("Close", close)] {
        if col.len() != expected {
            return Err(SignalError::ColumnLengthMismatch {
                column,
                expected,
                got: col.len(),
            });
        }
    }

    if expected == 0 {
        return Err(SignalError::InsufficientData { need: 1, got: 0 });
    }

    Ok((0..expected)
        .map(|i| Bar::new(open[i], high[i], low[i], close[i]))
        .collect())
}

// ============================================================
// SIGNAL IDENTITY
// ============================================================

/// Unique identifier for a signal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(pub &'static str);

impl SignalId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns the direction of the entry this signal marks.
    ///
    /// - `Some(Direction::Bullish)` - long-entry signal
    /// - `Some(Direction::Bearish)` - short-entry / exit signal
    /// - `None` - unknown (custom) signal
    pub fn direction(&self) -> Option<Direction> {
        match self.0 {
            "DOW_123_BULLISH_BREAKOUT"
            | "DOWNTREND_REVERSAL"
            | "TWELVE_BAR_BREAKOUT"
            | "DOWNTREND_LINE_BREAK" => Some(Direction::Bullish),
            "DOW_123_BEARISH_BREAKDOWN" => Some(Direction::Bearish),
            _ => None,
        }
    }

    /// Returns true if this signal marks a long entry
    pub fn is_bullish(&self) -> bool {
        matches!(self.direction(), Some(Direction::Bullish))
    }

    /// Returns true if this signal marks a short entry or exit
    pub fn is_bearish(&self) -> bool {
        matches!(self.direction(), Some(Direction::Bearish))
    }
}

/// Direction/bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

// ============================================================
// SIGNAL GENERATOR TRAITS
// ============================================================

/// Generic signal generator trait - for concrete types
///
/// Generation is infallible by design: a sequence too short for the
/// pattern yields an all-false series of the input length. Configuration
/// problems surface through [`validate_config`](Self::validate_config).
pub trait SignalGenerator: Send + Sync {
    fn id(&self) -> SignalId;

    /// Smallest input length that could ever produce a signal
    fn min_bars(&self) -> usize;

    /// Produce the boolean entry series, one value per input bar
    fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Object-safe signal generator trait - for custom signals
pub trait DynSignalGenerator: Send + Sync {
    fn id(&self) -> SignalId;
    fn min_bars(&self) -> usize;
    fn generate(&self, bars: &[&dyn OHLCV]) -> Vec<bool>;
    fn validate_config(&self) -> Result<()>;
}

impl<S: SignalGenerator> DynSignalGenerator for S {
    fn id(&self) -> SignalId {
        SignalGenerator::id(self)
    }

    fn min_bars(&self) -> usize {
        SignalGenerator::min_bars(self)
    }

    fn generate(&self, bars: &[&dyn OHLCV]) -> Vec<bool> {
        SignalGenerator::generate(self, bars)
    }

    fn validate_config(&self) -> Result<()> {
        SignalGenerator::validate_config(self)
    }
}

// ============================================================
// BUILTIN SIGNALS - generated via macro
// ============================================================

use signals::*;

/// Macro to generate BuiltinSignal enum without boilerplate
macro_rules! define_builtin_signals {
    (
        $(
            $variant:ident($signal:ty)
        ),* $(,)?
    ) => {
        /// All builtin signal engines - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinSignal {
            $($variant($signal)),*
        }

        impl BuiltinSignal {
            #[inline]
            pub fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
                match self {
                    $(Self::$variant(s) => SignalGenerator::generate(s, bars)),*
                }
            }

            #[inline]
            pub fn id(&self) -> SignalId {
                match self {
                    $(Self::$variant(s) => SignalGenerator::id(s)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(s) => SignalGenerator::min_bars(s)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(s) => SignalGenerator::validate_config(s)),*
                }
            }
        }
    };
}

define_builtin_signals! {
    Dow123Bullish(Dow123BullishBreakout),
    Dow123Bearish(Dow123BearishBreakdown),
    Reversal(DowntrendReversal),
    TwelveBar(TwelveBarBreakout),
    LineBreak(DowntrendLineBreak),
}

// ============================================================
// SIGNAL ENGINE
// ============================================================

/// One engine's output: the boolean entry series for the whole input
#[derive(Debug, Clone)]
pub struct SignalSeries {
    pub id: SignalId,
    pub values: Vec<bool>,
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validate_data: bool,
    pub signal_filter: Option<Vec<SignalId>>,
}

/// Main signal scanning engine
///
/// Runs every registered generator over the bar sequence. Generators are
/// independent pure passes and never observe each other's output.
pub struct SignalEngine {
    builtin: Vec<BuiltinSignal>,
    custom: Vec<Box<dyn DynSignalGenerator>>,
    config: EngineConfig,
}

impl SignalEngine {
    /// Scan all bars with every registered signal.
    ///
    /// Series are returned in registration order, builtins first.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<SignalSeries>> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let mut results = Vec::with_capacity(self.builtin.len() + self.custom.len());

        for signal in &self.builtin {
            if !self.should_include(signal.id()) {
                continue;
            }
            let values = if bars.len() >= signal.min_bars() {
                signal.generate(bars)
            } else {
                vec![false; bars.len()]
            };
            results.push(SignalSeries {
                id: signal.id(),
                values,
            });
        }

        if !self.custom.is_empty() {
            let bar_refs: Vec<&dyn OHLCV> = bars.iter().map(|b| b as &dyn OHLCV).collect();
            for signal in &self.custom {
                if !self.should_include(signal.id()) {
                    continue;
                }
                let values = if bars.len() >= signal.min_bars() {
                    signal.generate(&bar_refs)
                } else {
                    vec![false; bars.len()]
                };
                results.push(SignalSeries {
                    id: signal.id(),
                    values,
                });
            }
        }

        Ok(results)
    }

    /// Scan and group by bar: which signals fired at each position.
    pub fn scan_grouped<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Vec<SignalId>>> {
        let series = self.scan(bars)?;
        let mut grouped = vec![Vec::new(); bars.len()];

        for s in &series {
            for (i, &fired) in s.values.iter().enumerate() {
                if fired {
                    grouped[i].push(s.id);
                }
            }
        }

        Ok(grouped)
    }

    fn should_include(&self, id: SignalId) -> bool {
        match &self.config.signal_filter {
            Some(filter) => filter.contains(&id),
            None => true,
        }
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                SignalError::InvalidBar { reason, .. } => {
                    SignalError::InvalidBar { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for s in &self.builtin {
            s.validate_config()?;
        }
        for s in &self.custom {
            s.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SignalEngine instances
pub struct EngineBuilder {
    builtin: Vec<BuiltinSignal>,
    custom: Vec<Box<dyn DynSignalGenerator>>,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            builtin: Vec::new(),
            custom: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Add all builtin signals with default configurations
    pub fn with_all_defaults(mut self) -> Self {
        self.builtin.extend([
            BuiltinSignal::Dow123Bullish(Dow123BullishBreakout::with_defaults()),
            BuiltinSignal::Dow123Bearish(Dow123BearishBreakdown::with_defaults()),
            BuiltinSignal::Reversal(DowntrendReversal::with_defaults()),
            BuiltinSignal::TwelveBar(TwelveBarBreakout::with_defaults()),
            BuiltinSignal::LineBreak(DowntrendLineBreak::with_defaults()),
        ]);
        self
    }

    /// Add a builtin signal
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, signal: BuiltinSignal) -> Self {
        self.builtin.push(signal);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, signal: BuiltinSignal) -> Result<Self> {
        signal.validate_config()?;
        self.builtin.push(signal);
        Ok(self)
    }

    /// Add a custom signal (slow path)
    pub fn add_custom<S: DynSignalGenerator + 'static>(mut self, signal: S) -> Self {
        self.custom.push(Box::new(signal));
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Filter to specific signals only
    pub fn only_signals(mut self, ids: impl IntoIterator<Item = SignalId>) -> Self {
        self.config.signal_filter = Some(ids.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SignalEngine> {
        let engine = SignalEngine {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub series: Vec<SignalSeries>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: SignalError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &SignalEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|series| ScanResult {
                    symbol: symbol.to_string(),
                    series,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64) -> Bar {
        Bar::new((h + l) / 2.0, h, l, (h + l) / 2.0)
    }

    fn make_zigzag(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let phase = (i % 8) as f64;
                let base = 100.0 + if phase < 4.0 { phase * 2.0 } else { (8.0 - phase) * 2.0 };
                bar(base + 1.0, base - 1.0)
            })
            .collect()
    }

    #[test]
    fn test_percent_validation() {
        assert!(Percent::new(0.0).is_ok());
        assert!(Percent::new(2.0).is_ok());
        assert!(Percent::new(150.0).is_ok());
        assert!(Percent::new(-0.1).is_err());
        assert!(Percent::new(f64::NAN).is_err());
        assert!(Percent::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(52).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_bars_from_columns() {
        let o = [100.0, 101.0];
        let h = [102.0, 103.0];
        let l = [99.0, 100.0];
        let c = [101.0, 102.0];

        let bars = bars_from_columns(Some(&o), Some(&h), Some(&l), Some(&c)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].high, 103.0);
    }

    #[test]
    fn test_bars_from_columns_missing_column() {
        let o = [100.0];
        let h = [102.0];
        let c = [101.0];

        let err = bars_from_columns(Some(&o), Some(&h), None, Some(&c)).unwrap_err();
        assert!(matches!(err, SignalError::MissingColumn { column: "Low" }));
    }

    #[test]
    fn test_bars_from_columns_length_mismatch() {
        let o = [100.0, 101.0];
        let h = [102.0];
        let l = [99.0, 100.0];
        let c = [101.0, 102.0];

        let err = bars_from_columns(Some(&o), Some(&h), Some(&l), Some(&c)).unwrap_err();
        assert!(matches!(
            err,
            SignalError::ColumnLengthMismatch { column: "High", .. }
        ));
    }

    #[test]
    fn test_bars_from_columns_empty() {
        let empty: [f64; 0] = [];
        let err =
            bars_from_columns(Some(&empty), Some(&empty), Some(&empty), Some(&empty)).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData { need: 1, got: 0 }));
    }

    #[test]
    fn test_ohlcv_validate() {
        assert!(bar(102.0, 99.0).validate().is_ok());
        assert!(Bar::new(100.0, 99.0, 102.0, 100.0).validate().is_err());
        assert!(Bar::new(f64::NAN, 102.0, 99.0, 100.0).validate().is_err());
    }

    #[test]
    fn test_signal_id_direction() {
        assert!(SignalId("DOW_123_BULLISH_BREAKOUT").is_bullish());
        assert!(SignalId("DOW_123_BEARISH_BREAKDOWN").is_bearish());
        assert!(SignalId("TWELVE_BAR_BREAKOUT").is_bullish());
        assert_eq!(SignalId("SOMETHING_ELSE").direction(), None);
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_empty_scan() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Bar> = vec![];
        let series = engine.scan(&bars).unwrap();
        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn test_scan_series_lengths_match_input() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = make_zigzag(40);
        let series = engine.scan(&bars).unwrap();
        assert!(series.iter().all(|s| s.values.len() == bars.len()));
    }

    #[test]
    fn test_signal_filter() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .only_signals([SignalId("TWELVE_BAR_BREAKOUT")])
            .build()
            .unwrap();

        let series = engine.scan(&make_zigzag(40)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].id, SignalId("TWELVE_BAR_BREAKOUT"));
    }

    #[test]
    fn test_validate_data_rejects_bad_bar() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .validate_data(true)
            .build()
            .unwrap();

        let mut bars = make_zigzag(10);
        bars[3] = Bar::new(100.0, 98.0, 102.0, 100.0); // high < low

        let err = engine.scan(&bars).unwrap_err();
        assert!(matches!(err, SignalError::InvalidBar { index: 3, .. }));
    }

    #[test]
    fn test_scan_grouped() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = make_zigzag(40);
        let grouped = engine.scan_grouped(&bars).unwrap();
        assert_eq!(grouped.len(), bars.len());
    }

    /// Custom generator: fires whenever the close gaps up 2% over the
    /// previous close. Exercises the dyn path.
    struct GapUp;

    impl SignalGenerator for GapUp {
        fn id(&self) -> SignalId {
            SignalId("GAP_UP")
        }

        fn min_bars(&self) -> usize {
            2
        }

        fn generate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
            let mut out = vec![false; bars.len()];
            for i in 1..bars.len() {
                out[i] = bars[i].close() > bars[i - 1].close() * 1.02;
            }
            out
        }
    }

    #[test]
    fn test_custom_signal() {
        let engine = EngineBuilder::new().add_custom(GapUp).build().unwrap();

        let bars = vec![bar(101.0, 99.0), bar(106.0, 104.0), bar(106.5, 104.5)];
        let series = engine.scan(&bars).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values, vec![false, true, false]);
    }

    #[test]
    fn test_builtin_min_bars() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        // Shorter than every engine's minimum: all series all-false.
        let bars = make_zigzag(3);
        let series = engine.scan(&bars).unwrap();
        assert!(series
            .iter()
            .all(|s| s.values.len() == 3 && !s.values.iter().any(|&v| v)));
    }

    #[test]
    fn test_add_checked_rejects_bad_config() {
        let bad = DowntrendLineBreak::with_config(LineBreakConfig {
            min_peaks: 1,
            ..LineBreakConfig::default()
        });
        assert!(EngineBuilder::new()
            .add_checked(BuiltinSignal::LineBreak(bad))
            .is_err());
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

        let bars1 = make_zigzag(40);
        let bars2 = make_zigzag(60);

        let instruments: Vec<(&str, &[Bar])> = vec![("FMG", &bars1), ("BHP", &bars2)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = make_zigzag(48);

        let a = engine.scan(&bars).unwrap();
        let b = engine.scan(&bars).unwrap();
        for (sa, sb) in a.iter().zip(&b) {
            assert_eq!(sa.id, sb.id);
            assert_eq!(sa.values, sb.values);
        }
    }
}
