//! Файловые источники: таблица CSV и геометрия GeoJSON

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AnalysisError, Result};
use crate::types::{Geometry, GeometryRecord, RawCell, RawRow};

/// Источник сырых данных для конвейера
pub trait DataSource {
    fn load_rows(&self) -> Result<Vec<RawRow>>;
    fn load_geometry(&self) -> Result<Vec<GeometryRecord>>;
}

pub struct CsvTableSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn load(&self) -> Result<Vec<RawRow>> {
        let file = File::open(&self.path).map_err(|e| {
            AnalysisError::data_source(format!("cannot open {}: {e}", self.path.display()))
        })?;
        read_rows(file, self.delimiter)
    }
}

/// Читает таблицу с заголовком; пустые ячейки становятся пропусками
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AnalysisError::data_source(format!("cannot read CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record =
            record.map_err(|e| AnalysisError::data_source(format!("CSV row {}: {e}", i + 1)))?;
        let mut row = RawRow::new(i + 1);
        for (header, value) in headers.iter().zip(record.iter()) {
            let cell = if value.trim().is_empty() {
                RawCell::Missing
            } else {
                RawCell::Text(value.to_string())
            };
            row.cells.insert(header.clone(), cell);
        }
        rows.push(row);
    }

    tracing::debug!("Read {} CSV rows with {} columns", rows.len(), headers.len());
    Ok(rows)
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    geometry: Option<Geometry>,
}

pub struct GeoJsonSource {
    path: PathBuf,
    name_property: String,
}

impl GeoJsonSource {
    pub fn new(path: impl Into<PathBuf>, name_property: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name_property: name_property.into(),
        }
    }

    pub fn load(&self) -> Result<Vec<GeometryRecord>> {
        let file = File::open(&self.path).map_err(|e| {
            AnalysisError::data_source(format!("cannot open {}: {e}", self.path.display()))
        })?;
        read_geometry(file, &self.name_property)
    }
}

/// Читает FeatureCollection; объекты без геометрии пропускаются
pub fn read_geometry<R: Read>(reader: R, name_property: &str) -> Result<Vec<GeometryRecord>> {
    let collection: FeatureCollection = serde_json::from_reader(reader)
        .map_err(|e| AnalysisError::data_source(format!("invalid GeoJSON: {e}")))?;

    let mut records = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = match feature.properties.as_ref().and_then(|p| p.get(name_property)) {
            Some(Value::String(name)) => name.clone(),
            _ => {
                return Err(AnalysisError::data_source(format!(
                    "feature {i} has no string property '{name_property}'"
                )))
            }
        };
        match feature.geometry {
            Some(geometry) => records.push(GeometryRecord { name, geometry }),
            None => tracing::warn!("Feature '{}' has no geometry, skipped", name),
        }
    }

    Ok(records)
}

/// Пара файловых источников: таблица показателей и геометрия
pub struct FileSource {
    pub table: CsvTableSource,
    pub geometry: GeoJsonSource,
}

impl DataSource for FileSource {
    fn load_rows(&self) -> Result<Vec<RawRow>> {
        self.table.load()
    }

    fn load_geometry(&self) -> Result<Vec<GeometryRecord>> {
        self.geometry.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_blank_cells_become_missing() {
        let csv = "Provinsi,Sekolah,Siswa\n Prov. Aceh ,10,\nBali,,7\n";

        let rows = read_rows(csv.as_bytes(), b',').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].cell("Provinsi"), Some(&RawCell::Text(" Prov. Aceh ".to_string())));
        assert_eq!(rows[0].cell("Siswa"), Some(&RawCell::Missing));
        assert_eq!(rows[1].cell("Sekolah"), Some(&RawCell::Missing));
        assert_eq!(rows[1].cell("Siswa"), Some(&RawCell::Text("7".to_string())));
    }

    #[test]
    fn geojson_features_are_read_in_order() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"NAME_1": "Bali"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature", "properties": {"NAME_1": "Maluku"}, "geometry": null},
                {"type": "Feature", "properties": {"NAME_1": "Aceh"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[2,2,0],[3,2,0],[3,3,0],[2,2,0]]]]}}
            ]
        }"#;

        let records = read_geometry(json.as_bytes(), "NAME_1").unwrap();

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bali", "Aceh"]);
        assert_eq!(records[1].geometry.bounding_box(), Some([2.0, 2.0, 3.0, 3.0]));
    }

    #[test]
    fn geojson_without_name_property_is_source_error() {
        let json = r#"{"features": [{"properties": {"NAME": "Bali"}, "geometry": null}]}"#;
        let err = read_geometry(json.as_bytes(), "NAME_1").unwrap_err();
        assert!(matches!(err, AnalysisError::Source(_)));
    }
}
