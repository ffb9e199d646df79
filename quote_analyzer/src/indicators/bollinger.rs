//! Bollinger Bands over a rolling window of prices.
//!
//! For every window of `period` prices:
//!
//! ```text
//! center    = mean(window)
//! sigma     = sqrt(sum((x - center)^2) / period)      // population, not sample
//! upper     = center + multiplier * sigma
//! lower     = center - multiplier * sigma
//! percentB  = (price[i] - lower) / (upper - lower)
//! bandwidth = (upper - lower) / center
//! ```
//!
//! Each window is summed from scratch rather than updated incrementally, so
//! recomputing the same input always gives bit-identical output. A window of
//! identical prices has `sigma = 0` exactly and is handled by
//! [`DegeneratePolicy`].

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Which prices form the window evaluated at index `i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// `price[i + 1 - period ..= i]`; yields `len - period + 1` points.
    #[default]
    Trailing,
    /// `price[i .. i + period]`; yields `len - period + 1` points.
    Leading,
    /// `price[i - period .. i]`, so `price[i]` is measured against the band of
    /// the sessions before it; yields `len - period` points.
    Preceding,
}

/// How to report %B when the window has zero variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Emit `NaN`.
    #[default]
    Nan,
    /// Fail with [`Error::DegenerateWindow`].
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthFormula {
    /// `(upper - lower) / center`
    #[default]
    Conventional,
    /// `upper - lower / center`. Kept only for reproducing older output.
    Legacy,
}

/// Parameters of a Bollinger computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BollingerSettings {
    pub period: usize,
    pub multiplier: f64,
    pub alignment: WindowAlignment,
    pub degenerate: DegeneratePolicy,
    pub bandwidth: BandwidthFormula,
}

impl Default for BollingerSettings {
    fn default() -> Self {
        Self {
            period: 20,
            multiplier: 2.0,
            alignment: WindowAlignment::default(),
            degenerate: DegeneratePolicy::default(),
            bandwidth: BandwidthFormula::default(),
        }
    }
}

impl BollingerSettings {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            period,
            multiplier,
            ..Self::default()
        }
    }

    pub fn with_alignment(mut self, alignment: WindowAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_degenerate(mut self, degenerate: DegeneratePolicy) -> Self {
        self.degenerate = degenerate;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: BandwidthFormula) -> Self {
        self.bandwidth = bandwidth;
        self
    }
}

/// One row of an [`IndicatorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorPoint {
    /// Date of the evaluated session `i`.
    pub date: NaiveDate,
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
    pub percent_b: f64,
    pub bandwidth: f64,
}

/// Indicator output as parallel columns aligned by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorTable {
    pub date: Vec<NaiveDate>,
    pub center: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub percent_b: Vec<f64>,
    pub bandwidth: Vec<f64>,
}

impl IndicatorTable {
    fn with_capacity(n: usize) -> Self {
        Self {
            date: Vec::with_capacity(n),
            center: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
            lower: Vec::with_capacity(n),
            percent_b: Vec::with_capacity(n),
            bandwidth: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, p: IndicatorPoint) {
        self.date.push(p.date);
        self.center.push(p.center);
        self.upper.push(p.upper);
        self.lower.push(p.lower);
        self.percent_b.push(p.percent_b);
        self.bandwidth.push(p.bandwidth);
    }

    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// Row `i`, or `None` if any column is shorter than `i + 1`.
    pub fn get(&self, i: usize) -> Option<IndicatorPoint> {
        Some(IndicatorPoint {
            date: *self.date.get(i)?,
            center: *self.center.get(i)?,
            upper: *self.upper.get(i)?,
            lower: *self.lower.get(i)?,
            percent_b: *self.percent_b.get(i)?,
            bandwidth: *self.bandwidth.get(i)?,
        })
    }

    pub fn last(&self) -> Option<IndicatorPoint> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn points(&self) -> impl Iterator<Item = IndicatorPoint> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Numeric columns keyed by their published names, in output order.
    pub fn columns(&self) -> IndexMap<&'static str, &[f64]> {
        IndexMap::from([
            ("center", self.center.as_slice()),
            ("upper", self.upper.as_slice()),
            ("lower", self.lower.as_slice()),
            ("percentB", self.percent_b.as_slice()),
            ("bandwidth", self.bandwidth.as_slice()),
        ])
    }
}

/// Computes Bollinger Bands for `prices`, labelling each point with `dates`.
///
/// # Errors
///
/// - [`Error::Validation`] if `dates` and `prices` differ in length.
/// - [`Error::InvalidParameter`] if `period` is zero or longer than the
///   series, or the multiplier is negative or not finite. Never clamped.
/// - [`Error::DegenerateWindow`] for a flat window under
///   [`DegeneratePolicy::Error`].
pub fn bollinger_bands(
    dates: &[NaiveDate],
    prices: &[f64],
    settings: &BollingerSettings,
) -> Result<IndicatorTable> {
    if dates.len() != prices.len() {
        return Err(Error::Validation(format!(
            "{} dates for {} prices",
            dates.len(),
            prices.len()
        )));
    }

    let BollingerSettings {
        period,
        multiplier,
        alignment,
        degenerate,
        bandwidth: formula,
    } = *settings;
    let len = prices.len();

    if period == 0 {
        return Err(Error::InvalidParameter("period must be at least 1".into()));
    }
    if period > len {
        return Err(Error::InvalidParameter(format!(
            "period {period} exceeds series length {len}"
        )));
    }
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "multiplier must be a non-negative finite number, got {multiplier}"
        )));
    }

    let evaluated = match alignment {
        WindowAlignment::Trailing => (period - 1)..len,
        WindowAlignment::Leading => 0..(len - period + 1),
        WindowAlignment::Preceding => period..len,
    };

    let mut table = IndicatorTable::with_capacity(evaluated.len());
    for i in evaluated {
        let window = match alignment {
            WindowAlignment::Trailing => &prices[i + 1 - period..=i],
            WindowAlignment::Leading => &prices[i..i + period],
            WindowAlignment::Preceding => &prices[i - period..i],
        };

        // Identical prices give sigma == 0 exactly, whatever the rounding of the mean.
        let (center, sigma) = if window.iter().all(|&x| x == window[0]) {
            (window[0], 0.0)
        } else {
            let n = period as f64;
            let center = window.iter().sum::<f64>() / n;
            let variance = window
                .iter()
                .map(|x| {
                    let d = x - center;
                    d * d
                })
                .sum::<f64>()
                / n;
            (center, variance.sqrt())
        };

        let upper = center + multiplier * sigma;
        let lower = center - multiplier * sigma;
        let width = upper - lower;

        let percent_b = if width == 0.0 {
            match degenerate {
                DegeneratePolicy::Nan => f64::NAN,
                DegeneratePolicy::Error => return Err(Error::DegenerateWindow { date: dates[i] }),
            }
        } else {
            (prices[i] - lower) / width
        };

        let bandwidth = match formula {
            BandwidthFormula::Conventional => width / center,
            BandwidthFormula::Legacy => upper - lower / center,
        };

        table.push(IndicatorPoint {
            date: dates[i],
            center,
            upper,
            lower,
            percent_b,
            bandwidth,
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn preceding_window_on_ramp() {
        let prices = ramp(25);
        let d = dates(25);
        let settings = BollingerSettings::new(20, 2.0).with_alignment(WindowAlignment::Preceding);
        let table = bollinger_bands(&d, &prices, &settings).unwrap();

        assert_eq!(table.len(), 5);
        let first = table.get(0).unwrap();
        assert_eq!(first.date, d[20]);
        assert!(approx(first.center, 10.5, 1e-12));
        let sigma = (399.0_f64 / 12.0).sqrt();
        assert!(approx(sigma, 5.766, 1e-3));
        assert!(approx(first.upper, 22.03, 1e-2));
        assert!(approx(first.lower, -1.03, 1e-2));
        assert!(approx(first.percent_b, (21.0 - first.lower) / (first.upper - first.lower), 1e-12));
        assert!(approx(first.percent_b, 0.955, 2e-3));
    }

    #[test]
    fn trailing_window_edges() {
        let prices = ramp(25);
        let d = dates(25);
        let table = bollinger_bands(&d, &prices, &BollingerSettings::new(20, 2.0)).unwrap();

        assert_eq!(table.len(), 6);
        assert_eq!(table.date.first(), Some(&d[19]));
        assert_eq!(table.date.last(), Some(&d[24]));
        // First window is 1..=20, evaluated at price 20.
        assert!(approx(table.center[0], 10.5, 1e-12));
        assert!(approx(table.center[5], 15.5, 1e-12));
    }

    #[test]
    fn leading_window_edges() {
        let prices = ramp(25);
        let d = dates(25);
        let settings = BollingerSettings::new(20, 2.0).with_alignment(WindowAlignment::Leading);
        let table = bollinger_bands(&d, &prices, &settings).unwrap();

        assert_eq!(table.len(), 6);
        assert_eq!(table.date.first(), Some(&d[0]));
        assert_eq!(table.date.last(), Some(&d[5]));
        assert!(approx(table.center[0], 10.5, 1e-12));
        assert!(table.percent_b[0] < 0.5);
    }

    #[test]
    fn period_equal_to_length_yields_one_point() {
        let prices = ramp(20);
        let d = dates(20);
        for alignment in [WindowAlignment::Trailing, WindowAlignment::Leading] {
            let settings = BollingerSettings::new(20, 2.0).with_alignment(alignment);
            assert_eq!(bollinger_bands(&d, &prices, &settings).unwrap().len(), 1);
        }
        let preceding = BollingerSettings::new(20, 2.0).with_alignment(WindowAlignment::Preceding);
        assert!(bollinger_bands(&d, &prices, &preceding).unwrap().is_empty());
    }

    #[test]
    fn period_longer_than_series_is_rejected() {
        let err = bollinger_bands(&dates(5), &ramp(5), &BollingerSettings::new(6, 2.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn zero_period_and_bad_multiplier_are_rejected() {
        let (d, p) = (dates(5), ramp(5));
        assert!(matches!(
            bollinger_bands(&d, &p, &BollingerSettings::new(0, 2.0)),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bollinger_bands(&d, &p, &BollingerSettings::new(3, -1.0)),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bollinger_bands(&d, &p, &BollingerSettings::new(3, f64::NAN)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn mismatched_dates_are_a_validation_error() {
        let err = bollinger_bands(&dates(4), &ramp(5), &BollingerSettings::new(3, 2.0)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn flat_window_yields_nan_by_default() {
        let prices = vec![42.0; 10];
        let table = bollinger_bands(&dates(10), &prices, &BollingerSettings::new(5, 2.0)).unwrap();
        assert!(table.percent_b.iter().all(|v| v.is_nan()));
        assert!(table.bandwidth.iter().all(|v| *v == 0.0));
        assert!(table.upper.iter().zip(&table.lower).all(|(u, l)| u == l));
    }

    #[test]
    fn flat_window_errors_under_strict_policy() {
        let mut prices = ramp(10);
        prices[4..9].fill(7.0);
        let d = dates(10);
        let settings = BollingerSettings::new(5, 2.0).with_degenerate(DegeneratePolicy::Error);
        let err = bollinger_bands(&d, &prices, &settings).unwrap_err();
        match err {
            Error::DegenerateWindow { date } => assert_eq!(date, d[8]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn flat_runs_at_inexact_prices_are_degenerate() {
        for v in [0.1, 10.1, 33.33, 181.18] {
            let prices = vec![v; 20];
            let d = dates(20);

            let table = bollinger_bands(&d, &prices, &BollingerSettings::new(20, 2.0)).unwrap();
            assert_eq!(table.len(), 1);
            let p = table.get(0).unwrap();
            assert_eq!(p.center, v);
            assert_eq!(p.upper - p.lower, 0.0, "price {v}");
            assert!(p.percent_b.is_nan(), "price {v} gave %B {}", p.percent_b);
            assert_eq!(p.bandwidth, 0.0);

            let strict = BollingerSettings::new(20, 2.0).with_degenerate(DegeneratePolicy::Error);
            match bollinger_bands(&d, &prices, &strict) {
                Err(Error::DegenerateWindow { date }) => assert_eq!(date, d[19]),
                other => panic!("price {v}: expected DegenerateWindow, got {other:?}"),
            }
        }
    }

    #[test]
    fn flat_tail_after_moving_prices_is_degenerate() {
        let mut prices: Vec<f64> = (0..10).map(|i| 180.0 + i as f64 * 0.37).collect();
        prices.extend([181.18; 5]);
        let d = dates(15);
        let table = bollinger_bands(&d, &prices, &BollingerSettings::new(5, 2.0)).unwrap();
        assert!(table.last().unwrap().percent_b.is_nan());
        assert!(table.percent_b[..table.len() - 1].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn short_column_makes_rows_unavailable_instead_of_panicking() {
        let mut table = bollinger_bands(&dates(25), &ramp(25), &BollingerSettings::default()).unwrap();
        table.bandwidth.pop();
        assert_eq!(table.len(), 6);
        assert!(table.get(5).is_none());
        assert!(table.last().is_none());
        assert_eq!(table.points().count(), 5);
    }

    #[test]
    fn legacy_bandwidth_reproduces_precedence_quirk() {
        let prices = ramp(25);
        let d = dates(25);
        let conventional = bollinger_bands(&d, &prices, &BollingerSettings::new(20, 2.0)).unwrap();
        let legacy = bollinger_bands(
            &d,
            &prices,
            &BollingerSettings::new(20, 2.0).with_bandwidth(BandwidthFormula::Legacy),
        )
        .unwrap();

        for (c, l) in conventional.points().zip(legacy.points()) {
            assert_eq!(c.bandwidth, (c.upper - c.lower) / c.center);
            assert_eq!(l.bandwidth, l.upper - l.lower / l.center);
            assert_eq!(c.percent_b, l.percent_b);
        }
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.37).sin() * 3.1).collect();
        let d = dates(80);
        let settings = BollingerSettings::new(20, 2.0);
        let a = bollinger_bands(&d, &prices, &settings).unwrap();
        let b = bollinger_bands(&d, &prices, &settings).unwrap();
        for (x, y) in a.points().zip(b.points()) {
            assert_eq!(x.center.to_bits(), y.center.to_bits());
            assert_eq!(x.upper.to_bits(), y.upper.to_bits());
            assert_eq!(x.percent_b.to_bits(), y.percent_b.to_bits());
            assert_eq!(x.bandwidth.to_bits(), y.bandwidth.to_bits());
        }
    }

    #[test]
    fn columns_are_keyed_in_output_order() {
        let table = bollinger_bands(&dates(25), &ramp(25), &BollingerSettings::default()).unwrap();
        let cols = table.columns();
        let names: Vec<_> = cols.keys().copied().collect();
        assert_eq!(names, ["center", "upper", "lower", "percentB", "bandwidth"]);
        assert!(cols.values().all(|c| c.len() == table.len()));
        assert_eq!(table.last().unwrap().date, *table.date.last().unwrap());
    }

    proptest! {
        #[test]
        fn bands_enclose_center(
            prices in proptest::collection::vec(0.01f64..10_000.0, 1..80),
            period_seed in 1usize..80,
            multiplier in 0.0f64..4.0,
        ) {
            let period = 1 + period_seed % prices.len();
            let d = dates(prices.len());
            for alignment in [WindowAlignment::Trailing, WindowAlignment::Leading, WindowAlignment::Preceding] {
                let settings = BollingerSettings::new(period, multiplier).with_alignment(alignment);
                let table = bollinger_bands(&d, &prices, &settings).unwrap();
                let expected = match alignment {
                    WindowAlignment::Preceding => prices.len() - period,
                    _ => prices.len() - period + 1,
                };
                prop_assert_eq!(table.len(), expected);
                for p in table.points() {
                    prop_assert!(p.lower <= p.center && p.center <= p.upper);
                }
            }
        }

        #[test]
        fn constant_windows_never_produce_a_band(
            price in 0.01f64..10_000.0,
            len in 1usize..60,
            period_seed in 1usize..60,
        ) {
            let period = 1 + period_seed % len;
            let prices = vec![price; len];
            let table = bollinger_bands(&dates(len), &prices, &BollingerSettings::new(period, 2.0)).unwrap();
            for p in table.points() {
                prop_assert_eq!(p.upper, p.lower);
                prop_assert_eq!(p.center, price);
                prop_assert!(p.percent_b.is_nan());
            }

            let strict = BollingerSettings::new(period, 2.0).with_degenerate(DegeneratePolicy::Error);
            let is_degenerate = matches!(
                bollinger_bands(&dates(len), &prices, &strict),
                Err(Error::DegenerateWindow { .. })
            );
            prop_assert!(is_degenerate);
        }
    }
}
