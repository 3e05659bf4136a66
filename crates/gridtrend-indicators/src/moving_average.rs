//! Exponential moving average.

use gridtrend_core::error::IndicatorError;
use gridtrend_core::traits::{Indicator, PriceSeries};
use std::iter;

/// Exponential moving average of closes.
///
/// The first value, at index `period - 1`, is the mean of the first
/// `period` closes. Each later value moves toward the close by
/// `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "EMA period must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            period,
            alpha: 2.0 / (period + 1) as f64,
        })
    }
}

impl Indicator for Ema {
    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: PriceSeries<'_>) -> Vec<Option<f64>> {
        let close = series.close;
        if close.len() < self.period {
            return vec![None; close.len()];
        }

        let (head, tail) = close.split_at(self.period);
        let seed = head.iter().sum::<f64>() / self.period as f64;
        let alpha = self.alpha;
        let smoothed = tail.iter().scan(seed, move |ema, &x| {
            *ema += alpha * (x - *ema);
            Some(*ema)
        });

        iter::repeat(None)
            .take(self.warmup())
            .chain(iter::once(seed).chain(smoothed).map(Some))
            .collect()
    }
}
