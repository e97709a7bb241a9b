//! Пакетный запуск анализа: CSV + GeoJSON на входе, JSON-отчёт в stdout

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use edu_feasibility::{
    source::{CsvTableSource, FileSource, GeoJsonSource},
    Indicator, Pipeline, PipelineConfig,
};

#[derive(Debug, Parser)]
#[command(version, about = "Education feasibility analysis per province")]
struct Args {
    /// Таблица показателей (CSV)
    #[arg(long)]
    data: PathBuf,

    /// Границы провинций (GeoJSON FeatureCollection)
    #[arg(long)]
    geometry: Option<PathBuf>,

    /// Конфигурация конвейера (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Число кластеров
    #[arg(long)]
    k: Option<usize>,

    /// Seed кластеризации
    #[arg(long)]
    seed: Option<u64>,

    /// Seed симуляции
    #[arg(long)]
    simulation_seed: Option<u64>,

    /// Показатель для столбчатой диаграммы
    #[arg(long)]
    bar: Option<Indicator>,

    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Инициализация логирования (stdout занят отчётом)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = args.k {
        config.cluster.k = k;
    }
    if let Some(seed) = args.seed {
        config.cluster.seed = seed;
    }
    if let Some(seed) = args.simulation_seed {
        config.simulation.seed = seed;
    }
    if let Some(bar) = args.bar {
        config.presentation.bar_indicator = bar;
    }

    let delimiter = u8::try_from(args.delimiter).context("delimiter must be a single-byte character")?;
    let table = CsvTableSource::new(&args.data).with_delimiter(delimiter);
    let name_property = config.geo.geometry_name_property.clone();
    let pipeline = Pipeline::new(config);

    tracing::info!("Analyzing {}", args.data.display());

    let report = match &args.geometry {
        Some(geometry) => {
            let source = FileSource {
                table,
                geometry: GeoJsonSource::new(geometry, name_property),
            };
            pipeline.run_with_source(&source)
        }
        None => {
            let rows = table.load().context("loading indicator table")?;
            pipeline.run(&rows, None)
        }
    }
    .context("analysis failed")?;

    tracing::debug!("Report carries {} warnings", report.warnings.len());

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
