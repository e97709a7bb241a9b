//! Edu Feasibility - анализ пригодности школьной инфраструктуры по провинциям

pub mod config;
pub mod error;
pub mod types;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod source;

pub use error::{AnalysisError, DataQualityError, Result};
pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use config::PipelineConfig;
pub use pipeline::Pipeline;
