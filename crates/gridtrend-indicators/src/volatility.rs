//! Average true range.

use gridtrend_core::error::IndicatorError;
use gridtrend_core::traits::{Indicator, PriceSeries};
use std::iter;

/// Average true range with Wilder smoothing.
///
/// True range needs the previous close, so point 0 has none. The first
/// value sits at index `period` and averages true ranges `1..=period`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "ATR period must be greater than 0".to_string(),
            ));
        }
        Ok(Self { period })
    }
}

/// Widest of high-low and the gaps to the previous close.
fn true_range(series: &PriceSeries<'_>, i: usize) -> f64 {
    let prev = series.close[i - 1];
    series.high[i].max(prev) - series.low[i].min(prev)
}

impl Indicator for Atr {
    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, series: PriceSeries<'_>) -> Vec<Option<f64>> {
        let len = series.len();
        if len <= self.period {
            return vec![None; len];
        }

        let n = self.period as f64;
        let seed = (1..=self.period)
            .map(|i| true_range(&series, i))
            .sum::<f64>()
            / n;
        let smoothed = (self.period + 1..len)
            .map(|i| true_range(&series, i))
            .scan(seed, move |atr, tr| {
                *atr += (tr - *atr) / n;
                Some(*atr)
            });

        iter::repeat(None)
            .take(self.warmup())
            .chain(iter::once(seed).chain(smoothed).map(Some))
            .collect()
    }
}
