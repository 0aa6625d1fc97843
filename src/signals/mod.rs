//! Dow-structure entry signal engines.
//!
//! Each engine is an independent pure pass over the bar sequence and emits
//! a boolean series of the input length: `true` marks the single bar where
//! a completed pattern instance confirms. Engines never fail on short
//! input; a sequence too short for a given pattern simply yields an
//! all-false series.
//!
//! # Engines
//!
//! - [`Dow123BullishBreakout`] / [`Dow123BearishBreakdown`]: three-swing
//!   1-2-3 structures confirmed by a break of the middle swing's price.
//! - [`DowntrendReversal`]: mean-reversion entry when a confirmed
//!   downtrend breaks.
//! - [`TwelveBarBreakout`]: breakout above a 12-bar consolidation measured
//!   from a qualifying swing low.
//! - [`DowntrendLineBreak`]: break above a validated downtrend trendline.

/// Generate `with_defaults()` -> `Self::default()` for multiple signal types.
macro_rules! impl_with_defaults {
  ($($signal:ty),* $(,)?) => {
    $(impl $signal {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod breakout;
pub mod line_break;
pub mod reversal;
pub mod twelve_bar;

pub use breakout::*;
pub use line_break::*;
pub use reversal::*;
pub use twelve_bar::*;
