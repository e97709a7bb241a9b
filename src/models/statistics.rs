//! Описательная статистика и корреляции показателей

use ndarray::ArrayView1;

use crate::error::{AnalysisError, Result};
use crate::preprocessing::IndicatorMatrix;
use crate::types::{CorrelationMatrix, DescriptiveStats, Indicator, ProvinceRecord};

/// Квантиль с линейной интерполяцией между соседними рангами.
///
/// `sorted` должен быть отсортирован по возрастанию; для пустого среза NaN.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub struct StatisticalProfiler;

impl StatisticalProfiler {
    pub fn summarize(
        &self,
        records: &[ProvinceRecord],
        indicators: &[Indicator],
    ) -> Result<Vec<DescriptiveStats>> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let matrix = IndicatorMatrix::project(records, indicators)?;
        let stats = indicators
            .iter()
            .enumerate()
            .map(|(j, &indicator)| describe(indicator, &matrix.sorted_column(j)))
            .collect();

        Ok(stats)
    }

    pub fn correlate(
        &self,
        records: &[ProvinceRecord],
        indicators: &[Indicator],
    ) -> Result<CorrelationMatrix> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let matrix = IndicatorMatrix::project(records, indicators)?;
        let values = matrix.values();
        let n = indicators.len();
        let mut corr = vec![vec![f64::NAN; n]; n];

        for i in 0..n {
            let x = values.column(i);
            if is_constant(&x) {
                continue;
            }
            corr[i][i] = 1.0;
            for j in (i + 1)..n {
                let y = values.column(j);
                if is_constant(&y) {
                    continue;
                }
                let r = pearson(&x, &y);
                corr[i][j] = r;
                corr[j][i] = r;
            }
        }

        Ok(CorrelationMatrix {
            indicators: indicators.to_vec(),
            values: corr,
        })
    }
}

fn describe(indicator: Indicator, sorted: &[f64]) -> DescriptiveStats {
    let count = sorted.len();
    let n = count as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    // Выборочное отклонение (n - 1), как в табличных сводках
    let std = if count < 2 {
        f64::NAN
    } else {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };

    DescriptiveStats {
        indicator,
        count,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q1: quantile(sorted, 0.25),
        median: quantile(sorted, 0.5),
        q3: quantile(sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

fn is_constant(column: &ArrayView1<'_, f64>) -> bool {
    let mut values = column.iter();
    match values.next() {
        Some(&first) => values.all(|&v| v == first),
        None => true,
    }
}

fn pearson(x: &ArrayView1<'_, f64>, y: &ArrayView1<'_, f64>) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.sum() / n;
    let mean_y = y.sum() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(f64, f64, f64)]) -> Vec<ProvinceRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(a, b, c))| {
                ProvinceRecord::from_pairs(
                    &format!("P{i}"),
                    &[
                        (Indicator::Schools, a),
                        (Indicator::Students, b),
                        (Indicator::Repeaters, c),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn summarize_matches_known_values() {
        let data = records(&[(1.0, 0.0, 5.0), (2.0, 0.0, 5.0), (3.0, 0.0, 5.0), (4.0, 0.0, 5.0), (5.0, 0.0, 5.0)]);
        let stats = StatisticalProfiler
            .summarize(&data, &[Indicator::Schools, Indicator::Repeaters])
            .unwrap();

        let schools = &stats[0];
        assert_eq!(schools.count, 5);
        assert_eq!(schools.mean, 3.0);
        assert!((schools.std - 2.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!((schools.min, schools.q1, schools.median, schools.q3, schools.max), (1.0, 2.0, 3.0, 4.0, 5.0));

        let repeaters = &stats[1];
        assert_eq!(repeaters.std, 0.0);
        assert_eq!(repeaters.q1, 5.0);
    }

    #[test]
    fn summarize_empty_is_error() {
        let err = StatisticalProfiler.summarize(&[], &[Indicator::Schools]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDataset));
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let data = records(&[(1.0, 2.0, 9.0), (2.0, 4.1, 7.0), (3.0, 6.3, 8.0), (4.0, 7.9, 1.0)]);
        let indicators = [Indicator::Schools, Indicator::Students, Indicator::Repeaters];
        let corr = StatisticalProfiler.correlate(&data, &indicators).unwrap();

        for i in 0..3 {
            assert!((corr.values[i][i] - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(corr.values[i][j], corr.values[j][i]);
                assert!((-1.0..=1.0).contains(&corr.values[i][j]));
            }
        }
        assert!(corr.get(Indicator::Schools, Indicator::Students).unwrap() > 0.99);
    }

    #[test]
    fn zero_variance_yields_nan_sentinel() {
        let data = records(&[(1.0, 3.0, 0.0), (2.0, 3.0, 1.0), (3.0, 3.0, 4.0)]);
        let indicators = [Indicator::Schools, Indicator::Students, Indicator::Repeaters];
        let corr = StatisticalProfiler.correlate(&data, &indicators).unwrap();

        assert!(corr.get(Indicator::Students, Indicator::Students).unwrap().is_nan());
        assert!(corr.get(Indicator::Schools, Indicator::Students).unwrap().is_nan());
        assert!(corr.get(Indicator::Students, Indicator::Repeaters).unwrap().is_nan());
        assert!(!corr.get(Indicator::Schools, Indicator::Repeaters).unwrap().is_nan());
    }
}
