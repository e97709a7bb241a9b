use std::io::Write;

use edu_feasibility::source::{CsvTableSource, DataSource, FileSource, GeoJsonSource};
use edu_feasibility::{Indicator, Pipeline, PipelineConfig};

const CSV: &str = "\
Provinsi;Sekolah;Siswa;Mengulang;Putus Sekolah;Ruang kelas(rusak berat)
Prov. Aceh;4000;900000;300;40;120
Prov. D.K.I. Jakarta;3000;1200000;;10;15
Prov. Luar Negeri;10;2000;0;0;0
Prov. Papua;2500;500000;1900;35;2400
";

const GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"NAME_1": "Aceh"},
     "geometry": {"type": "Polygon", "coordinates": [[[95.0, 2.0], [98.0, 2.0], [98.0, 6.0], [95.0, 2.0]]]}},
    {"type": "Feature", "properties": {"NAME_1": "Jakarta"},
     "geometry": {"type": "Polygon", "coordinates": [[[106.6, -6.4], [107.0, -6.4], [107.0, -6.0], [106.6, -6.4]]]}},
    {"type": "Feature", "properties": {"NAME_1": "Papua"},
     "geometry": {"type": "Polygon", "coordinates": [[[135.0, -9.0], [141.0, -9.0], [141.0, -1.0], [135.0, -9.0]]]}}
  ]
}"#;

fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_sources_feed_the_pipeline() {
    let csv = write_temp(CSV, ".csv");
    let geojson = write_temp(GEOJSON, ".geojson");

    let source = FileSource {
        table: CsvTableSource::new(csv.path()).with_delimiter(b';'),
        geometry: GeoJsonSource::new(geojson.path(), "NAME_1"),
    };

    let rows = source.load_rows().unwrap();
    assert_eq!(rows.len(), 4);

    let mut config = PipelineConfig::default();
    config.cluster.k = 2;
    let report = Pipeline::new(config).run_with_source(&source).unwrap();

    let jakarta = report.records.iter().find(|r| r.name == "D.K.I. Jakarta").unwrap();
    assert_eq!(jakarta.value(Indicator::Repeaters), 0.0);
    assert_eq!(report.missing_counts["Mengulang"], 1);

    let geo = report.geo.unwrap();
    let matched: Vec<_> = geo.matched.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(matched, vec!["Aceh", "Jakarta", "Papua"]);
    assert_eq!(geo.excluded, vec!["Luar Negeri".to_string()]);
    assert!(geo.unmatched_geometry.is_empty());
    assert_eq!(geo.bounds, Some([95.0, -9.0, 141.0, 6.0]));
}

#[test]
fn broken_geometry_file_only_fails_the_join() {
    let csv = write_temp(CSV, ".csv");
    let geojson = write_temp("{ not json", ".geojson");

    let source = FileSource {
        table: CsvTableSource::new(csv.path()).with_delimiter(b';'),
        geometry: GeoJsonSource::new(geojson.path(), "NAME_1"),
    };

    let report = Pipeline::new(PipelineConfig::default())
        .run_with_source(&source)
        .unwrap();

    assert!(report.geo.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, "geo_join");
    assert!(report.descriptive.is_some());
    assert!(report.clusters.is_some());
}

#[test]
fn missing_table_file_is_source_error() {
    let err = CsvTableSource::new("/nonexistent/kelayakan.csv").load().unwrap_err();
    assert!(err.to_string().contains("kelayakan.csv"));
}
