/// Аналитические модели

pub mod statistics;
pub mod outliers;
pub mod clustering;
pub mod geo_join;
pub mod simulation;
pub mod presentation;

pub use statistics::StatisticalProfiler;
pub use outliers::OutlierDetector;
pub use clustering::{ClusterAnalyzer, ClusterAssignment, ClusterParams};
pub use geo_join::{AliasTable, GeoJoiner, Resolution};
pub use simulation::{Histogram, SimulationEngine, UniformRange};
