//! Симуляция Монте-Карло: добавление классов и снижение числа второгодников

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{AnalysisError, Result};
use crate::types::{HistogramBin, SimulationSample};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformRange {
    pub min: f64,
    pub max: f64,
}

impl UniformRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(AnalysisError::randomization(format!(
                "range bounds must be finite, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(AnalysisError::randomization(format!(
                "range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        rng.gen_range(self.min..=self.max)
    }
}

impl From<(f64, f64)> for UniformRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

pub struct SimulationEngine;

impl SimulationEngine {
    /// `output = input × factor`, где input и factor равномерны на своих отрезках
    pub fn run(
        &self,
        n_trials: usize,
        input_range: UniformRange,
        factor_range: UniformRange,
        seed: u64,
    ) -> Result<Vec<SimulationSample>> {
        input_range.validate()?;
        factor_range.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let samples: Vec<SimulationSample> = (0..n_trials)
            .map(|_| {
                let input = input_range.sample(&mut rng);
                let factor = factor_range.sample(&mut rng);
                SimulationSample {
                    input,
                    factor,
                    output: input * factor,
                }
            })
            .collect();

        tracing::info!("Simulation: {} trials, seed {}", n_trials, seed);

        Ok(samples)
    }
}

/// Гистограмма с равными по ширине корзинами между минимумом и максимумом
pub struct Histogram;

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>> {
        if bins == 0 {
            return Err(AnalysisError::configuration("histogram needs at least one bin"));
        }
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max == min {
            return Ok(vec![HistogramBin {
                start: min,
                end: max,
                count: values.len() as u64,
            }]);
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0u64; bins];
        for &v in values {
            // Максимум попадает в последнюю корзину
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: min + width * i as f64,
                end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
                count,
            })
            .collect())
    }
}
