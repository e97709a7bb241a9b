//! Обнаружение выбросов по межквартильному размаху

use crate::error::{AnalysisError, Result};
use crate::models::statistics::quantile;
use crate::preprocessing::IndicatorMatrix;
use crate::types::{Fences, Indicator, OutlierFlag, OutlierReport, ProvinceRecord};

const IQR_MULTIPLIER: f64 = 1.5;

/// Детектор выбросов по паре наблюдаемых показателей
pub struct OutlierDetector {
    watched: [Indicator; 2],
}

impl OutlierDetector {
    pub fn new(first: Indicator, second: Indicator) -> Result<Self> {
        if first == second {
            return Err(AnalysisError::configuration(format!(
                "outlier detector needs two distinct indicators, got '{first}' twice"
            )));
        }
        Ok(Self {
            watched: [first, second],
        })
    }

    pub fn watched(&self) -> [Indicator; 2] {
        self.watched
    }

    /// Границы Q1 - 1.5·IQR и Q3 + 1.5·IQR по всему набору записей
    pub fn fences(&self, records: &[ProvinceRecord]) -> Result<Vec<Fences>> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let matrix = IndicatorMatrix::project(records, &self.watched)?;
        let fences = self
            .watched
            .iter()
            .enumerate()
            .map(|(j, &indicator)| {
                let sorted = matrix.sorted_column(j);
                let q1 = quantile(&sorted, 0.25);
                let q3 = quantile(&sorted, 0.75);
                let iqr = q3 - q1;
                Fences {
                    indicator,
                    q1,
                    q3,
                    iqr,
                    lower: q1 - IQR_MULTIPLIER * iqr,
                    upper: q3 + IQR_MULTIPLIER * iqr,
                }
            })
            .collect();

        Ok(fences)
    }

    pub fn detect(&self, records: &[ProvinceRecord]) -> Result<OutlierReport> {
        let fences = self.fences(records)?;

        let flagged: Vec<OutlierFlag> = records
            .iter()
            .filter_map(|record| {
                let triggered: Vec<(Indicator, f64)> = fences
                    .iter()
                    .map(|f| (f, record.value(f.indicator)))
                    .filter(|(f, value)| f.is_outside(*value))
                    .map(|(f, value)| (f.indicator, value))
                    .collect();

                (!triggered.is_empty()).then(|| OutlierFlag {
                    name: record.name.clone(),
                    triggered,
                })
            })
            .collect();

        tracing::info!(
            "Outlier detection over {} records: {} flagged",
            records.len(),
            flagged.len()
        );

        Ok(OutlierReport { fences, flagged })
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            watched: [Indicator::Repeaters, Indicator::Dropouts],
        }
    }
}
