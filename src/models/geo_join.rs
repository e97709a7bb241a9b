//! Соединение показателей провинций с геометрией для картограммы

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{GeoConfig, SplitProvincePolicy};
use crate::error::{AnalysisError, Result};
use crate::types::{GeoJoin, GeometryRecord, Indicator, JoinMismatch, JoinedRow, ProvinceRecord};

/// Куда ведёт имя провинции из таблицы
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Ключ геометрии
    Key(String),
    Excluded,
    /// Провинция выделена из родительской после съёмки геометрии
    Split { parent: String },
}

/// Проверенное при создании отображение имён таблицы на ключи геометрии
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
    excluded: BTreeSet<String>,
    split_parents: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new(
        aliases: BTreeMap<String, String>,
        excluded: impl IntoIterator<Item = String>,
        split_parents: BTreeMap<String, String>,
    ) -> Result<Self> {
        let excluded: BTreeSet<String> = excluded.into_iter().collect();

        let all_names = aliases
            .iter()
            .chain(split_parents.iter())
            .flat_map(|(a, b)| [a, b])
            .chain(excluded.iter());
        if all_names.into_iter().any(|n| n.trim().is_empty()) {
            return Err(AnalysisError::configuration("alias table contains an empty name"));
        }

        for (from, to) in &aliases {
            if excluded.contains(from) || excluded.contains(to) {
                return Err(AnalysisError::configuration(format!(
                    "'{from}' -> '{to}' is both aliased and excluded"
                )));
            }
            if from != to && aliases.contains_key(to) {
                return Err(AnalysisError::configuration(format!(
                    "alias chain: '{from}' -> '{to}' -> '{}'",
                    aliases[to]
                )));
            }
        }

        for (child, parent) in &split_parents {
            if aliases.contains_key(child) || excluded.contains(child) {
                return Err(AnalysisError::configuration(format!(
                    "split province '{child}' is also aliased or excluded"
                )));
            }
            if excluded.contains(parent) || split_parents.contains_key(parent) {
                return Err(AnalysisError::configuration(format!(
                    "split parent '{parent}' of '{child}' cannot be excluded or split itself"
                )));
            }
        }

        Ok(Self {
            aliases,
            excluded,
            split_parents,
        })
    }

    pub fn from_config(config: &GeoConfig) -> Result<Self> {
        Self::new(
            config.aliases.clone(),
            config.excluded.iter().cloned(),
            config.split_parents.clone(),
        )
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        if self.excluded.contains(name) {
            return Resolution::Excluded;
        }
        if let Some(parent) = self.split_parents.get(name) {
            return Resolution::Split {
                parent: self.alias(parent).to_string(),
            };
        }
        Resolution::Key(self.alias(name).to_string())
    }

    fn alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }
}

/// Провинция после разрешения имени, до сопоставления с геометрией
struct Resolved {
    source_name: String,
    key: String,
    indicators: BTreeMap<Indicator, f64>,
}

pub struct GeoJoiner {
    aliases: AliasTable,
    split_policy: SplitProvincePolicy,
    indicator: Indicator,
}

impl GeoJoiner {
    pub fn new(aliases: AliasTable, split_policy: SplitProvincePolicy, indicator: Indicator) -> Self {
        Self {
            aliases,
            split_policy,
            indicator,
        }
    }

    pub fn from_config(config: &GeoConfig) -> Result<Self> {
        Ok(Self::new(
            AliasTable::from_config(config)?,
            config.split_policy,
            config.choropleth_indicator,
        ))
    }

    pub fn join(&self, records: &[ProvinceRecord], geometry: &[GeometryRecord]) -> Result<GeoJoin> {
        let mut resolved: Vec<Resolved> = Vec::with_capacity(records.len());
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut excluded = Vec::new();
        let mut splits: Vec<(&ProvinceRecord, String)> = Vec::new();

        for record in records {
            match self.aliases.resolve(&record.name) {
                Resolution::Excluded => excluded.push(record.name.clone()),
                Resolution::Split { parent } => match self.split_policy {
                    SplitProvincePolicy::Exclude => excluded.push(record.name.clone()),
                    SplitProvincePolicy::RollUp => splits.push((record, parent)),
                },
                Resolution::Key(key) => {
                    if let Some(&other) = by_key.get(&key) {
                        return Err(AnalysisError::configuration(format!(
                            "'{}' and '{}' both resolve to geometry key '{key}'",
                            resolved[other].source_name, record.name
                        )));
                    }
                    by_key.insert(key.clone(), resolved.len());
                    resolved.push(Resolved {
                        source_name: record.name.clone(),
                        key,
                        indicators: record.indicators.clone(),
                    });
                }
            }
        }

        let mut rolled_up = Vec::new();
        let mut unmatched_provinces = Vec::new();
        for (record, parent) in splits {
            match by_key.get(&parent) {
                Some(&idx) => {
                    for (indicator, value) in &record.indicators {
                        *resolved[idx].indicators.entry(*indicator).or_insert(0.0) += value;
                    }
                    rolled_up.push(record.name.clone());
                }
                None => unmatched_provinces.push(JoinMismatch {
                    source_name: record.name.clone(),
                    resolved_name: parent,
                }),
            }
        }

        let mut used = vec![false; resolved.len()];
        let mut matched = Vec::new();
        let mut unmatched_geometry = Vec::new();

        for geo in geometry {
            let key = geo.name.trim();
            match by_key.get(key) {
                Some(&idx) => {
                    used[idx] = true;
                    let province = &resolved[idx];
                    matched.push(JoinedRow {
                        name: key.to_string(),
                        geometry: geo.geometry.clone(),
                        value: province.indicators.get(&self.indicator).copied().unwrap_or(0.0),
                        indicators: province.indicators.clone(),
                    });
                }
                None => unmatched_geometry.push(geo.name.clone()),
            }
        }

        unmatched_provinces.extend(resolved.iter().zip(&used).filter(|(_, used)| !**used).map(
            |(province, _)| JoinMismatch {
                source_name: province.source_name.clone(),
                resolved_name: province.key.clone(),
            },
        ));

        for mismatch in &unmatched_provinces {
            tracing::warn!(
                "No geometry for province '{}' (resolved as '{}')",
                mismatch.source_name,
                mismatch.resolved_name
            );
        }
        if !unmatched_geometry.is_empty() {
            tracing::warn!("Geometry without indicator data: {:?}", unmatched_geometry);
        }

        let bounds = matched
            .iter()
            .filter_map(|row| row.geometry.bounding_box())
            .reduce(|[a, b, c, d], [x0, y0, x1, y1]| [a.min(x0), b.min(y0), c.max(x1), d.max(y1)]);

        tracing::info!(
            "Geo join: {} matched, {} unmatched geometry, {} unmatched provinces, {} excluded",
            matched.len(),
            unmatched_geometry.len(),
            unmatched_provinces.len(),
            excluded.len()
        );

        Ok(GeoJoin {
            indicator: self.indicator,
            matched,
            unmatched_geometry,
            unmatched_provinces,
            excluded,
            rolled_up,
            bounds,
        })
    }
}
