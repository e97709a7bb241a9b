//! Конфигурация конвейера

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::types::Indicator;

/// Что делать со строкой, где числовая ячейка не разбирается
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRowPolicy {
    /// Прервать нормализацию на первой ошибке
    #[default]
    Abort,
    /// Отбросить строку, остальные обработать
    SkipRow,
}

/// Провинции, выделенные после съёмки геометрии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitProvincePolicy {
    #[default]
    Exclude,
    /// Сложить показатели в родительскую провинцию
    RollUp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_name_prefixes")]
    pub name_prefixes: Vec<String>,
    #[serde(default)]
    pub malformed_rows: MalformedRowPolicy,
}

fn default_name_column() -> String { "Provinsi".to_string() }
fn default_name_prefixes() -> Vec<String> { vec!["Prov. ".to_string()] }

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            name_column: default_name_column(),
            name_prefixes: default_name_prefixes(),
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    #[serde(default = "default_watched")]
    pub watched: [Indicator; 2],
}

fn default_watched() -> [Indicator; 2] { [Indicator::Repeaters, Indicator::Dropouts] }

impl Default for OutlierConfig {
    fn default() -> Self {
        Self { watched: default_watched() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_cluster_features")]
    pub features: Vec<Indicator>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_cluster_features() -> Vec<Indicator> {
    vec![Indicator::ClassroomsHeavyDamage, Indicator::Repeaters]
}
fn default_k() -> usize { 3 }
fn default_max_iterations() -> usize { 300 }

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            features: default_cluster_features(),
            k: default_k(),
            seed: 0,
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Свойство GeoJSON с названием провинции
    #[serde(default = "default_geometry_name_property")]
    pub geometry_name_property: String,
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
    #[serde(default = "default_split_parents")]
    pub split_parents: BTreeMap<String, String>,
    #[serde(default)]
    pub split_policy: SplitProvincePolicy,
    #[serde(default = "default_choropleth_indicator")]
    pub choropleth_indicator: Indicator,
}

fn default_geometry_name_property() -> String { "NAME_1".to_string() }

fn default_aliases() -> BTreeMap<String, String> {
    [("D.K.I. Jakarta", "Jakarta"), ("D.I. Yogyakarta", "Yogyakarta")]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn default_excluded() -> Vec<String> { vec!["Luar Negeri".to_string()] }

fn default_split_parents() -> BTreeMap<String, String> {
    [
        ("Papua Tengah", "Papua"),
        ("Papua Selatan", "Papua"),
        ("Papua Pegunungan", "Papua"),
        ("Papua Barat Daya", "Papua Barat"),
    ]
    .into_iter()
    .map(|(child, parent)| (child.to_string(), parent.to_string()))
    .collect()
}

fn default_choropleth_indicator() -> Indicator { Indicator::ClassroomsHeavyDamage }

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            geometry_name_property: default_geometry_name_property(),
            aliases: default_aliases(),
            excluded: default_excluded(),
            split_parents: default_split_parents(),
            split_policy: SplitProvincePolicy::default(),
            choropleth_indicator: default_choropleth_indicator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default = "default_input_range")]
    pub input_range: (f64, f64),
    #[serde(default = "default_factor_range")]
    pub factor_range: (f64, f64),
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

fn default_trials() -> usize { 1000 }
fn default_input_range() -> (f64, f64) { (0.0, 500.0) }
fn default_factor_range() -> (f64, f64) { (0.05, 0.1) }
fn default_histogram_bins() -> usize { 30 }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            input_range: default_input_range(),
            factor_range: default_factor_range(),
            seed: 0,
            histogram_bins: default_histogram_bins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Показатель для столбчатой диаграммы (выбирается при вызове)
    #[serde(default = "default_bar_indicator")]
    pub bar_indicator: Indicator,
    #[serde(default = "default_scatter_axes")]
    pub scatter_axes: (Indicator, Indicator),
}

fn default_bar_indicator() -> Indicator { Indicator::Repeaters }
fn default_scatter_axes() -> (Indicator, Indicator) {
    (Indicator::ClassroomsHeavyDamage, Indicator::Repeaters)
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            bar_indicator: default_bar_indicator(),
            scatter_axes: default_scatter_axes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub outliers: OutlierConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnalysisError::configuration(format!("invalid config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config.normalizer.name_column, "Provinsi");
        assert_eq!(config.cluster.k, 3);
        assert_eq!(config.simulation.trials, 1000);
        assert_eq!(config.simulation.input_range, (0.0, 500.0));
        assert_eq!(config.geo.split_policy, SplitProvincePolicy::Exclude);
        assert_eq!(
            config.geo.aliases.get("D.K.I. Jakarta").map(String::as_str),
            Some("Jakarta")
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"cluster": {"k": 2, "seed": 42}, "normalizer": {"malformed_rows": "skip_row"}}"#,
        )
        .unwrap();
        assert_eq!(config.cluster.k, 2);
        assert_eq!(config.cluster.seed, 42);
        assert_eq!(config.cluster.max_iterations, 300);
        assert_eq!(config.normalizer.malformed_rows, MalformedRowPolicy::SkipRow);
        assert_eq!(config.normalizer.name_prefixes, vec!["Prov. ".to_string()]);
    }

    #[test]
    fn invalid_json_is_configuration_error() {
        let err = PipelineConfig::from_json_str("{\"cluster\": 5}").unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }
}
