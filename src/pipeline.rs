//! Последовательный запуск всех этапов анализа

use chrono::Utc;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::clustering::{ClusterAnalyzer, ClusterParams};
use crate::models::geo_join::GeoJoiner;
use crate::models::outliers::OutlierDetector;
use crate::models::presentation::{self, rank_by};
use crate::models::simulation::{Histogram, SimulationEngine, UniformRange};
use crate::models::statistics::StatisticalProfiler;
use crate::preprocessing::Normalizer;
use crate::source::DataSource;
use crate::types::{
    AnalysisReport, ClusterOutput, GeoJoin, GeometryRecord, Indicator, ProvinceRecord, RawRow,
    SimulationOutput, StageFailure,
};

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Загружает данные из источника; ошибка геометрии не останавливает остальные этапы
    pub fn run_with_source(&self, source: &dyn DataSource) -> Result<AnalysisReport> {
        let rows = source.load_rows()?;
        match source.load_geometry() {
            Ok(geometry) => self.run(&rows, Some(geometry.as_slice())),
            Err(e) => {
                tracing::warn!("Geometry load failed: {}", e);
                let mut report = self.run(&rows, None)?;
                report.failures.push(StageFailure {
                    stage: "geo_join".to_string(),
                    error: e.to_string(),
                });
                Ok(report)
            }
        }
    }

    /// Ошибку возвращает только нормализация; сбой прочих этапов попадает в `failures`
    pub fn run(&self, rows: &[RawRow], geometry: Option<&[GeometryRecord]>) -> Result<AnalysisReport> {
        let normalized = Normalizer::new(self.config.normalizer.clone()).normalize(rows)?;
        let records = &normalized.records;

        let mut warnings: Vec<String> = normalized
            .missing_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(column, count)| format!("column '{column}': {count} missing values filled with 0"))
            .collect();
        warnings.extend(normalized.rejected.iter().map(|r| format!("rejected row: {r}")));

        let mut failures = Vec::new();

        let descriptive = stage("descriptive", &mut failures, || {
            StatisticalProfiler.summarize(records, &Indicator::ALL)
        });
        let correlation = stage("correlation", &mut failures, || {
            StatisticalProfiler.correlate(records, &Indicator::ALL)
        });
        let outliers = stage("outliers", &mut failures, || {
            let [a, b] = self.config.outliers.watched;
            OutlierDetector::new(a, b)?.detect(records)
        });
        let ranking = Some(rank_by(records, self.config.presentation.bar_indicator));
        let scatter = stage("scatter", &mut failures, || {
            let (x, y) = self.config.presentation.scatter_axes;
            presentation::scatter(records, x, y)
        });
        let clusters = stage("clustering", &mut failures, || self.cluster(records));
        let geo = match geometry {
            Some(geometry) => stage("geo_join", &mut failures, || self.join(records, geometry)),
            None => None,
        };
        let simulation = stage("simulation", &mut failures, || self.simulate());

        if let Some(clusters) = &clusters {
            if !clusters.converged {
                warnings.push(format!("clustering stopped after {} iterations without converging", clusters.iterations));
            }
        }
        if let Some(geo) = &geo {
            warnings.extend(
                geo.unmatched_geometry
                    .iter()
                    .map(|name| format!("geometry '{name}' has no indicator data")),
            );
            warnings.extend(geo.unmatched_provinces.iter().map(|m| {
                format!("province '{}' has no geometry (resolved as '{}')", m.source_name, m.resolved_name)
            }));
        }

        let labelled = match &clusters {
            Some(output) => records
                .iter()
                .zip(&output.labels)
                .map(|(record, (_, label))| record.with_cluster(*label))
                .collect(),
            None => records.clone(),
        };

        tracing::info!(
            "Pipeline finished: {} records, {} warnings, {} failed stages",
            records.len(),
            warnings.len(),
            failures.len()
        );

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            records: labelled,
            missing_counts: normalized.missing_counts.clone(),
            rejected_rows: normalized.rejected.clone(),
            descriptive,
            correlation,
            outliers,
            ranking,
            scatter,
            clusters,
            geo,
            simulation,
            warnings,
            failures,
        })
    }

    fn cluster(&self, records: &[ProvinceRecord]) -> Result<ClusterOutput> {
        let analyzer = ClusterAnalyzer::new(ClusterParams::from(&self.config.cluster))?;
        let assignment = analyzer.cluster(records)?;
        Ok(analyzer.output(records, &assignment))
    }

    fn join(&self, records: &[ProvinceRecord], geometry: &[GeometryRecord]) -> Result<GeoJoin> {
        GeoJoiner::from_config(&self.config.geo)?.join(records, geometry)
    }

    pub fn simulate(&self) -> Result<SimulationOutput> {
        let sim = &self.config.simulation;
        let samples = SimulationEngine.run(
            sim.trials,
            UniformRange::from(sim.input_range),
            UniformRange::from(sim.factor_range),
            sim.seed,
        )?;
        let outputs: Vec<f64> = samples.iter().map(|s| s.output).collect();
        let histogram = Histogram::new(&outputs, sim.histogram_bins)?;

        Ok(SimulationOutput {
            seed: sim.seed,
            outputs,
            histogram,
        })
    }
}

fn stage<T>(name: &str, failures: &mut Vec<StageFailure>, run: impl FnOnce() -> Result<T>) -> Option<T> {
    match run() {
        Ok(output) => Some(output),
        Err(e) => {
            tracing::warn!("Stage '{}' failed: {}", name, e);
            failures.push(StageFailure {
                stage: name.to_string(),
                error: e.to_string(),
            });
            None
        }
    }
}
