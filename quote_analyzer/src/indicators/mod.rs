//! Rolling indicators computed over an assembled series.
//!
//! Everything here is a pure function of its inputs: no I/O, no shared state,
//! safe to call from any number of threads over independent series.

pub mod bollinger;

pub use bollinger::{
    BandwidthFormula, BollingerSettings, DegeneratePolicy, IndicatorPoint, IndicatorTable,
    WindowAlignment, bollinger_bands,
};
