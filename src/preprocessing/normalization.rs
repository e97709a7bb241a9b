//! Нормализация сырых строк в записи провинций

use std::collections::{BTreeMap, HashMap};

use crate::config::{MalformedRowPolicy, NormalizerConfig};
use crate::error::{DataQualityError, Result};
use crate::types::{Indicator, NormalizedSet, ProvinceRecord, RawCell, RawRow};

pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Каноническое имя: пробелы по краям и префикс региона удаляются
    pub fn canonical_name(&self, raw: &str) -> String {
        let mut name = raw.trim();
        for prefix in &self.config.name_prefixes {
            if let Some(stripped) = name.strip_prefix(prefix.as_str()) {
                name = stripped.trim_start();
                break;
            }
        }
        name.trim().to_string()
    }

    pub fn normalize(&self, rows: &[RawRow]) -> Result<NormalizedSet> {
        let mut missing_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for row in rows {
            // Пропуски считаем до разбора: это наблюдаемость, не валидация
            self.count_missing(row, &mut missing_counts);

            match self.normalize_row(row, &seen) {
                Ok(record) => {
                    seen.insert(record.name.clone(), row.row);
                    records.push(record);
                }
                Err(e) => match self.config.malformed_rows {
                    MalformedRowPolicy::Abort => return Err(e.into()),
                    MalformedRowPolicy::SkipRow => {
                        tracing::warn!("Rejected row {}: {}", e.row(), e);
                        rejected.push(e.to_string());
                    }
                },
            }
        }

        for (column, count) in &missing_counts {
            if *count > 0 {
                tracing::warn!("Column '{}' has {} missing values, filled with 0", column, count);
            }
        }

        tracing::info!(
            "Normalized {} of {} rows ({} rejected)",
            records.len(),
            rows.len(),
            rejected.len()
        );

        Ok(NormalizedSet {
            records,
            missing_counts,
            rejected,
        })
    }

    fn count_missing(&self, row: &RawRow, counts: &mut BTreeMap<String, usize>) {
        let mut columns: Vec<&str> = vec![self.config.name_column.as_str()];
        columns.extend(Indicator::ALL.iter().map(|i| i.header()));

        for column in columns {
            let entry = counts.entry(column.to_string()).or_insert(0);
            if is_missing(lookup(row, column)) {
                *entry += 1;
            }
        }
    }

    fn normalize_row(
        &self,
        row: &RawRow,
        seen: &HashMap<String, usize>,
    ) -> std::result::Result<ProvinceRecord, DataQualityError> {
        let name = match row.cell(&self.config.name_column) {
            Some(RawCell::Text(text)) => self.canonical_name(text),
            Some(RawCell::Number(n)) => n.to_string(),
            Some(RawCell::Missing) | None => String::new(),
        };
        if name.is_empty() {
            return Err(DataQualityError::MissingName { row: row.row });
        }
        if let Some(&first_row) = seen.get(&name) {
            return Err(DataQualityError::DuplicateName {
                row: row.row,
                name,
                first_row,
            });
        }

        let mut indicators = BTreeMap::new();
        for indicator in Indicator::ALL {
            let value = parse_numeric(row.row, indicator.header(), lookup(row, indicator.header()))?;
            indicators.insert(indicator, value);
        }

        Ok(ProvinceRecord {
            name,
            indicators,
            cluster: None,
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

/// Ищет ячейку по заголовку с учётом битых вариантов написания
fn lookup<'a>(row: &'a RawRow, column: &str) -> Option<&'a RawCell> {
    row.cell(column).or_else(|| {
        let indicator = Indicator::from_header(column)?;
        row.cells
            .iter()
            .find(|(header, _)| Indicator::from_header(header) == Some(indicator))
            .map(|(_, cell)| cell)
    })
}

/// Текстовые маркеры пропуска, которые выгрузки таблиц пишут вместо пустой ячейки
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: Option<&RawCell>) -> bool {
    match cell {
        None | Some(RawCell::Missing) => true,
        Some(RawCell::Text(text)) => {
            let text = text.trim();
            text.is_empty() || NA_TOKENS.contains(&text)
        }
        Some(RawCell::Number(n)) => n.is_nan(),
    }
}

fn parse_numeric(
    row: usize,
    column: &str,
    cell: Option<&RawCell>,
) -> std::result::Result<f64, DataQualityError> {
    if is_missing(cell) {
        return Ok(0.0);
    }

    let value = match cell {
        Some(RawCell::Number(n)) => *n,
        Some(RawCell::Text(text)) => {
            text.trim()
                .parse::<f64>()
                .map_err(|_| DataQualityError::NotNumeric {
                    row,
                    column: column.to_string(),
                    value: text.clone(),
                })?
        }
        _ => 0.0,
    };

    if !value.is_finite() {
        return Err(DataQualityError::NotFinite {
            row,
            column: column.to_string(),
        });
    }
    if value < 0.0 {
        return Err(DataQualityError::Negative {
            row,
            column: column.to_string(),
            value,
        });
    }

    Ok(value)
}
