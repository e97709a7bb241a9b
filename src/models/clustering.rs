//! Кластеризация провинций (алгоритм Ллойда с детерминированным стартом)

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::config::ClusterConfig;
use crate::error::{AnalysisError, Result};
use crate::preprocessing::IndicatorMatrix;
use crate::types::{ClusterOutput, Indicator, ProvinceRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub features: Vec<Indicator>,
    pub k: usize,
    pub seed: u64,
    pub max_iterations: usize,
}

impl From<&ClusterConfig> for ClusterParams {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            features: config.features.clone(),
            k: config.k,
            seed: config.seed,
            max_iterations: config.max_iterations,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// Метка для каждой записи, в порядке записей
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusterAssignment {
    /// Списки провинций по кластерам
    pub fn memberships(&self, names: &[String]) -> Vec<Vec<String>> {
        let mut members = vec![Vec::new(); self.centroids.len()];
        for (name, &label) in names.iter().zip(&self.labels) {
            members[label].push(name.clone());
        }
        members
    }
}

pub struct ClusterAnalyzer {
    params: ClusterParams,
}

impl ClusterAnalyzer {
    pub fn new(params: ClusterParams) -> Result<Self> {
        if params.features.is_empty() {
            return Err(AnalysisError::configuration("clustering needs at least one feature"));
        }
        if params.k == 0 {
            return Err(AnalysisError::configuration("k must be positive"));
        }
        if params.max_iterations == 0 {
            return Err(AnalysisError::configuration("max_iterations must be positive"));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn cluster(&self, records: &[ProvinceRecord]) -> Result<ClusterAssignment> {
        let k = self.params.k;
        let matrix = IndicatorMatrix::project(records, &self.params.features)?;
        let points: Vec<Vec<f64>> = matrix.values().rows().into_iter().map(|r| r.to_vec()).collect();

        let mut distinct: Vec<Vec<f64>> = Vec::new();
        for point in &points {
            if !distinct.contains(point) {
                distinct.push(point.clone());
            }
        }
        if k > distinct.len() {
            return Err(AnalysisError::configuration(format!(
                "k ({k}) exceeds the number of distinct points ({})",
                distinct.len()
            )));
        }

        tracing::info!(
            "Clustering {} records: k={}, seed={}, max_iterations={}",
            records.len(),
            k,
            self.params.seed,
            self.params.max_iterations
        );

        // Стартовые центроиды: k различных точек, выбранных по seed
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut centroids: Vec<Vec<f64>> = index::sample(&mut rng, distinct.len(), k)
            .into_iter()
            .map(|i| distinct[i].clone())
            .collect();

        let mut labels: Vec<usize> = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        for iter in 0..self.params.max_iterations {
            iterations = iter + 1;
            let next = assign(&points, &centroids);
            if next == labels {
                converged = true;
                break;
            }
            labels = next;
            update_centroids(&points, &labels, &mut centroids);
            tracing::debug!("Iteration {}: centroids {:?}", iterations, centroids);
        }

        if !converged {
            tracing::warn!(
                "Clustering did not converge after {} iterations",
                self.params.max_iterations
            );
        }

        let (labels, centroids) = canonicalize(labels, centroids);

        Ok(ClusterAssignment {
            labels,
            centroids,
            iterations,
            converged,
        })
    }

    /// Копия записей с меткой кластера; исходный набор не изменяется
    pub fn label_records(
        &self,
        records: &[ProvinceRecord],
    ) -> Result<(Vec<ProvinceRecord>, ClusterAssignment)> {
        let assignment = self.cluster(records)?;
        let labelled = records
            .iter()
            .zip(&assignment.labels)
            .map(|(record, &label)| record.with_cluster(label))
            .collect();
        Ok((labelled, assignment))
    }

    pub fn output(&self, records: &[ProvinceRecord], assignment: &ClusterAssignment) -> ClusterOutput {
        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
        ClusterOutput {
            k: self.params.k,
            features: self.params.features.clone(),
            labels: names.iter().cloned().zip(assignment.labels.iter().copied()).collect(),
            centroids: assignment.centroids.clone(),
            members: assignment.memberships(&names),
            iterations: assignment.iterations,
            converged: assignment.converged,
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Ближайший центроид; при равенстве побеждает меньший индекс
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, centroid) in centroids.iter().enumerate() {
                let dist = squared_distance(point, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            best
        })
        .collect()
}

/// Центроид без точек остаётся на прежнем месте, k не уменьшается
fn update_centroids(points: &[Vec<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) {
    let dims = centroids.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }

    for (j, centroid) in centroids.iter_mut().enumerate() {
        if counts[j] == 0 {
            tracing::debug!("Cluster {} is empty, keeping previous centroid", j);
            continue;
        }
        for (c, s) in centroid.iter_mut().zip(&sums[j]) {
            *c = s / counts[j] as f64;
        }
    }
}

/// Перенумерация кластеров в порядке первого появления в записях
fn canonicalize(labels: Vec<usize>, centroids: Vec<Vec<f64>>) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut order: Vec<usize> = Vec::with_capacity(centroids.len());
    for &label in &labels {
        if !order.contains(&label) {
            order.push(label);
        }
    }
    for j in 0..centroids.len() {
        if !order.contains(&j) {
            order.push(j);
        }
    }

    let mut remap = vec![0; centroids.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new;
    }

    let labels = labels.into_iter().map(|l| remap[l]).collect();
    let centroids = order.iter().map(|&old| centroids[old].clone()).collect();
    (labels, centroids)
}
