//! Indicator trait definitions.

/// Price columns an indicator reads from. Columns are truncated to the shortest.
#[derive(Debug, Clone, Copy)]
pub struct PriceSeries<'a> {
    pub high: &'a [f64],
    pub low: &'a [f64],
    pub close: &'a [f64],
}

impl<'a> PriceSeries<'a> {
    pub fn new(high: &'a [f64], low: &'a [f64], close: &'a [f64]) -> Self {
        let len = high.len().min(low.len()).min(close.len());
        Self {
            high: &high[..len],
            low: &low[..len],
            close: &close[..len],
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Batch indicator producing one value per input point.
pub trait Indicator: Send + Sync {
    /// Number of leading points with no value.
    fn warmup(&self) -> usize;

    /// Values aligned with the input; `None` while warming up.
    fn compute(&self, series: PriceSeries<'_>) -> Vec<Option<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// High minus low of the previous point.
    struct LaggedRange;

    impl Indicator for LaggedRange {
        fn warmup(&self) -> usize {
            1
        }

        fn compute(&self, series: PriceSeries<'_>) -> Vec<Option<f64>> {
            (0..series.len())
                .map(|i| i.checked_sub(1).map(|p| series.high[p] - series.low[p]))
                .collect()
        }
    }

    #[test]
    fn test_series_truncates_to_shortest_column() {
        let series = PriceSeries::new(&[3.0, 4.0, 5.0], &[1.0, 2.0], &[2.0, 3.0, 4.0]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.high, &[3.0, 4.0]);
    }

    #[test]
    fn test_output_aligned_with_input() {
        let high = [10.0, 12.0, 11.0];
        let low = [9.0, 9.0, 10.0];
        let close = [9.5, 11.0, 10.5];
        let values = LaggedRange.compute(PriceSeries::new(&high, &low, &close));

        assert_eq!(values.len(), 3);
        assert_eq!(values.iter().take_while(|v| v.is_none()).count(), LaggedRange.warmup());
        assert_eq!(values[2], Some(3.0));
    }
}
