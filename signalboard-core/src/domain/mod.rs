//! Domain types for SignalBoard

pub mod bar;
pub mod interval;

pub use bar::{PriceBar, PriceSeries};
pub use interval::{Interval, ParseRangeError, Period};

/// Symbol type alias
pub type Symbol = String;
