//! Числовая проекция записей на выбранные показатели

use ndarray::{Array2, ArrayView1};

use crate::error::{AnalysisError, Result};
use crate::types::{Indicator, ProvinceRecord};

/// Матрица показателей: строки по провинциям, столбцы по показателям
#[derive(Debug, Clone)]
pub struct IndicatorMatrix {
    indicators: Vec<Indicator>,
    names: Vec<String>,
    values: Array2<f64>,
}

impl IndicatorMatrix {
    pub fn project(records: &[ProvinceRecord], indicators: &[Indicator]) -> Result<Self> {
        if indicators.is_empty() {
            return Err(AnalysisError::configuration("no indicators selected"));
        }
        if let Some(dup) = indicators
            .iter()
            .enumerate()
            .find(|&(i, ind)| indicators[..i].contains(ind))
            .map(|(_, ind)| ind)
        {
            return Err(AnalysisError::configuration(format!(
                "indicator '{dup}' selected twice"
            )));
        }

        let mut values = Array2::zeros((records.len(), indicators.len()));
        for (i, record) in records.iter().enumerate() {
            for (j, &indicator) in indicators.iter().enumerate() {
                values[[i, j]] = record.value(indicator);
            }
        }

        Ok(Self {
            indicators: indicators.to_vec(),
            names: records.iter().map(|r| r.name.clone()).collect(),
            values,
        })
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column(&self, indicator: Indicator) -> Option<ArrayView1<'_, f64>> {
        let j = self.indicators.iter().position(|&i| i == indicator)?;
        Some(self.values.column(j))
    }

    /// Отсортированный по возрастанию столбец
    pub fn sorted_column(&self, j: usize) -> Vec<f64> {
        let mut column = self.values.column(j).to_vec();
        column.sort_by(f64::total_cmp);
        column
    }
}
