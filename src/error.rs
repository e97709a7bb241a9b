//! Ошибки конвейера анализа

use thiserror::Error;

/// Ошибка качества исходных данных (одна строка таблицы)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    #[error("row {row}: column '{column}' is not numeric: {value:?}")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: column '{column}' is negative: {value}")]
    Negative { row: usize, column: String, value: f64 },

    #[error("row {row}: column '{column}' is not finite")]
    NotFinite { row: usize, column: String },

    #[error("row {row}: province name is missing")]
    MissingName { row: usize },

    #[error("row {row}: duplicate province '{name}' (first seen in row {first_row})")]
    DuplicateName {
        row: usize,
        name: String,
        first_row: usize,
    },
}

impl DataQualityError {
    /// Номер строки, к которой относится ошибка
    pub fn row(&self) -> usize {
        match self {
            Self::NotNumeric { row, .. }
            | Self::Negative { row, .. }
            | Self::NotFinite { row, .. }
            | Self::MissingName { row }
            | Self::DuplicateName { row, .. } => *row,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("data quality error: {0}")]
    DataQuality(#[from] DataQualityError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("randomization error: {0}")]
    Randomization(String),

    #[error("empty dataset")]
    EmptyDataset,

    #[error("data source error: {0}")]
    Source(String),
}

impl AnalysisError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn randomization(message: impl Into<String>) -> Self {
        Self::Randomization(message.into())
    }

    pub fn data_source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
