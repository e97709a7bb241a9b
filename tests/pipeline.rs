use edu_feasibility::config::{ClusterConfig, PipelineConfig};
use edu_feasibility::{Geometry, GeometryRecord, Indicator, OutlierDetector, Pipeline, RawRow};

const DAMAGED: &str = "Ruang kelas(rusak berat)";
const REPEATERS: &str = "Mengulang";
const DROPOUTS: &str = "Putus Sekolah";

fn square(x: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        vec![x, 0.0],
        vec![x + 1.0, 0.0],
        vec![x + 1.0, 1.0],
        vec![x, 0.0],
    ]])
}

fn geometry(names: &[&str]) -> Vec<GeometryRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| GeometryRecord {
            name: name.to_string(),
            geometry: square(i as f64),
        })
        .collect()
}

fn three_provinces() -> Vec<RawRow> {
    vec![
        RawRow::new(1)
            .with_text("Provinsi", "Prov. Aceh")
            .with_text(DAMAGED, "120")
            .with_text(REPEATERS, "300")
            .with_text(DROPOUTS, "40"),
        RawRow::new(2)
            .with_text("Provinsi", " Prov. Bali ")
            .with_number(DAMAGED, 90.0)
            .with_number(REPEATERS, 250.0)
            .with_missing(DROPOUTS),
        RawRow::new(3)
            .with_text("Provinsi", "Prov. Papua")
            .with_text(DAMAGED, "2400")
            .with_text(REPEATERS, "1900")
            .with_text(DROPOUTS, "35"),
    ]
}

fn config(k: usize, seed: u64) -> PipelineConfig {
    PipelineConfig {
        cluster: ClusterConfig {
            k,
            seed,
            ..ClusterConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn three_province_scenario() {
    let pipeline = Pipeline::new(config(2, 42));
    let geo = geometry(&["Aceh", "Bali", "Papua", "Maluku"]);

    let report = pipeline.run(&three_provinces(), Some(geo.as_slice())).unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Aceh", "Bali", "Papua"]);
    assert_eq!(report.records[1].value(Indicator::Dropouts), 0.0);
    assert_eq!(report.missing_counts[DROPOUTS], 1);

    // Квартили по трём значениям: Q1 = (a+b)/2, Q3 = (b+c)/2, верхняя граница всегда >= максимума
    let outliers = report.outliers.unwrap();
    let repeaters = outliers.fences[0];
    assert_eq!((repeaters.q1, repeaters.q3), (275.0, 1100.0));
    assert!(outliers.flagged.is_empty());

    let clusters = report.clusters.unwrap();
    assert_eq!(
        clusters.labels,
        vec![
            ("Aceh".to_string(), 0),
            ("Bali".to_string(), 0),
            ("Papua".to_string(), 1)
        ]
    );
    assert_eq!(report.records[2].cluster, Some(1));

    let geo_join = report.geo.unwrap();
    assert_eq!(geo_join.matched.len(), 3);
    assert_eq!(geo_join.unmatched_geometry, vec!["Maluku".to_string()]);
    assert_eq!(geo_join.matched.len() + geo_join.unmatched_geometry.len(), geo.len());
    assert!(report.warnings.iter().any(|w| w.contains("Maluku")));

    let ranking = report.ranking.unwrap();
    assert_eq!(ranking[0].name, "Papua");

    let simulation = report.simulation.unwrap();
    assert_eq!(simulation.outputs.len(), 1000);
    assert!(simulation.outputs.iter().all(|o| (0.0..=50.0).contains(o)));
    assert_eq!(simulation.histogram.iter().map(|b| b.count).sum::<u64>(), 1000);
}

#[test]
fn clustering_is_repeatable_across_runs() {
    let pipeline = Pipeline::new(config(2, 7));
    let a = pipeline.run(&three_provinces(), None).unwrap();
    let b = pipeline.run(&three_provinces(), None).unwrap();

    assert_eq!(a.clusters.unwrap().labels, b.clusters.unwrap().labels);
    assert_eq!(a.simulation.unwrap().outputs, b.simulation.unwrap().outputs);
}

#[test]
fn failed_stage_does_not_block_others() {
    // k больше числа различных точек, кластеризация падает
    let pipeline = Pipeline::new(config(5, 0));
    let mut rows = three_provinces();
    rows.push(RawRow::new(4).with_text("Provinsi", "D.K.I. Jakarta"));
    rows.push(RawRow::new(5).with_text("Provinsi", "Jakarta"));

    let report = pipeline
        .run(&rows, Some(geometry(&["Jakarta", "Aceh"]).as_slice()))
        .unwrap();

    let failed: Vec<_> = report.failures.iter().map(|f| f.stage.as_str()).collect();
    assert_eq!(failed, vec!["clustering", "geo_join"]);
    assert!(report.clusters.is_none());
    assert!(report.geo.is_none());
    assert!(report.descriptive.is_some());
    assert!(report.correlation.is_some());
    assert!(report.outliers.is_some());
    assert!(report.records.iter().all(|r| r.cluster.is_none()));
}

#[test]
fn malformed_cell_aborts_by_default() {
    let mut rows = three_provinces();
    rows.push(
        RawRow::new(4)
            .with_text("Provinsi", "Riau")
            .with_text(REPEATERS, "banyak"),
    );

    let err = Pipeline::new(PipelineConfig::default())
        .run(&rows, None)
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("row 4"));
    assert!(message.contains(REPEATERS));
}

#[test]
fn detector_matches_pipeline_defaults() {
    let detector = OutlierDetector::default();
    assert_eq!(
        detector.watched(),
        PipelineConfig::default().outliers.watched
    );
}

#[test]
fn report_serializes_nan_as_null() {
    let report = Pipeline::new(config(2, 0))
        .run(&three_provinces(), None)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    // "Sekolah" везде 0, корреляция не определена
    assert!(json["correlation"]["values"][0][0].is_null());
    assert!(json["geo"].is_null());
}
