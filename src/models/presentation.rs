/// Подготовка данных для графиков: рейтинг, диаграмма рассеяния, линия тренда

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use crate::error::{AnalysisError, Result};
use crate::models::statistics::quantile;
use crate::types::{Indicator, ProvinceRecord, RankedValue, ScatterOutput, ScatterPoint, TrendLine};

/// Рейтинг провинций по показателю (по убыванию, порядок равных сохраняется)
pub fn rank_by(records: &[ProvinceRecord], indicator: Indicator) -> Vec<RankedValue> {
    let mut ranked: Vec<RankedValue> = records
        .iter()
        .map(|r| RankedValue {
            name: r.name.clone(),
            value: r.value(indicator),
        })
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked
}

/// Точки рассеяния; выделены провинции с y выше третьего квартиля
pub fn scatter(records: &[ProvinceRecord], x: Indicator, y: Indicator) -> Result<ScatterOutput> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }

    let mut ys: Vec<f64> = records.iter().map(|r| r.value(y)).collect();
    ys.sort_by(f64::total_cmp);
    let q3 = quantile(&ys, 0.75);

    let points = records
        .iter()
        .map(|r| ScatterPoint {
            name: r.name.clone(),
            x: r.value(x),
            y: r.value(y),
            highlighted: r.value(y) > q3,
        })
        .collect();

    Ok(ScatterOutput {
        x,
        y,
        points,
        trend: trend_line(records, x, y)?,
    })
}

/// Линейная регрессия y по x; None, если точек меньше двух или x постоянен
pub fn trend_line(records: &[ProvinceRecord], x: Indicator, y: Indicator) -> Result<Option<TrendLine>> {
    if records.len() < 2 {
        return Ok(None);
    }

    let xs: Vec<f64> = records.iter().map(|r| r.value(x)).collect();
    if xs.iter().all(|&v| v == xs[0]) {
        return Ok(None);
    }

    let features = Array2::from_shape_vec((xs.len(), 1), xs)
        .map_err(|e| AnalysisError::configuration(format!("trend line shape: {e}")))?;
    let targets: Array1<f64> = records.iter().map(|r| r.value(y)).collect();

    let dataset = Dataset::new(features, targets);
    let model = LinearRegression::new()
        .fit(&dataset)
        .map_err(|e| AnalysisError::configuration(format!("trend line fit failed: {e}")))?;

    Ok(Some(TrendLine {
        slope: model.params()[0],
        intercept: model.intercept(),
    }))
}
