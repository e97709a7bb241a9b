/// Типы данных для конвейера анализа

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Числовые показатели таблицы пригодности школ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Schools,
    Students,
    Repeaters,
    Dropouts,
    TeachersBelowS1,
    TeachersS1OrAbove,
    StaffSm,
    StaffAboveSm,
    StudyGroups,
    ClassroomsGood,
    ClassroomsLightDamage,
    ClassroomsModerateDamage,
    ClassroomsHeavyDamage,
}

impl Indicator {
    pub const ALL: [Indicator; 13] = [
        Indicator::Schools,
        Indicator::Students,
        Indicator::Repeaters,
        Indicator::Dropouts,
        Indicator::TeachersBelowS1,
        Indicator::TeachersS1OrAbove,
        Indicator::StaffSm,
        Indicator::StaffAboveSm,
        Indicator::StudyGroups,
        Indicator::ClassroomsGood,
        Indicator::ClassroomsLightDamage,
        Indicator::ClassroomsModerateDamage,
        Indicator::ClassroomsHeavyDamage,
    ];

    /// Заголовок колонки в исходном CSV
    pub fn header(self) -> &'static str {
        match self {
            Indicator::Schools => "Sekolah",
            Indicator::Students => "Siswa",
            Indicator::Repeaters => "Mengulang",
            Indicator::Dropouts => "Putus Sekolah",
            Indicator::TeachersBelowS1 => "Kepala Sekolah dan Guru(<S1)",
            Indicator::TeachersS1OrAbove => "Kepala Sekolah dan Guru(≥ S1)",
            Indicator::StaffSm => "Tenaga Kependidikan(SM)",
            Indicator::StaffAboveSm => "Tenaga Kependidikan(>SM)",
            Indicator::StudyGroups => "Rombongan Belajar",
            Indicator::ClassroomsGood => "Ruang kelas(baik)",
            Indicator::ClassroomsLightDamage => "Ruang kelas(rusak ringan)",
            Indicator::ClassroomsModerateDamage => "Ruang kelas(rusak sedang)",
            Indicator::ClassroomsHeavyDamage => "Ruang kelas(rusak berat)",
        }
    }

    /// Альтернативные написания заголовка (файл выгружен в cp1252, "≥" приходит битым)
    fn header_variants(self) -> &'static [&'static str] {
        match self {
            Indicator::TeachersS1OrAbove => &["Kepala Sekolah dan Guru(â‰¥ S1)"],
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Indicator::Schools => "schools",
            Indicator::Students => "students",
            Indicator::Repeaters => "repeaters",
            Indicator::Dropouts => "dropouts",
            Indicator::TeachersBelowS1 => "teachers_below_s1",
            Indicator::TeachersS1OrAbove => "teachers_s1_or_above",
            Indicator::StaffSm => "staff_sm",
            Indicator::StaffAboveSm => "staff_above_sm",
            Indicator::StudyGroups => "study_groups",
            Indicator::ClassroomsGood => "classrooms_good",
            Indicator::ClassroomsLightDamage => "classrooms_light_damage",
            Indicator::ClassroomsModerateDamage => "classrooms_moderate_damage",
            Indicator::ClassroomsHeavyDamage => "classrooms_heavy_damage",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.header() == header || i.header_variants().contains(&header))
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Indicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.name() == s)
            .or_else(|| Self::from_header(s))
            .ok_or_else(|| format!("unknown indicator: {s}"))
    }
}

/// Ячейка сырой строки в том виде, в каком её отдал источник
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCell {
    Missing,
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Номер строки в источнике (с 1, без заголовка)
    pub row: usize,
    pub cells: BTreeMap<String, RawCell>,
}

impl RawRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, column: &str, value: &str) -> Self {
        self.cells
            .insert(column.to_string(), RawCell::Text(value.to_string()));
        self
    }

    pub fn with_number(mut self, column: &str, value: f64) -> Self {
        self.cells.insert(column.to_string(), RawCell::Number(value));
        self
    }

    pub fn with_missing(mut self, column: &str) -> Self {
        self.cells.insert(column.to_string(), RawCell::Missing);
        self
    }

    pub fn cell(&self, column: &str) -> Option<&RawCell> {
        self.cells.get(column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    pub name: String,
    pub indicators: BTreeMap<Indicator, f64>,
    /// Метка кластера, появляется только в копии после кластеризации
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
}

impl ProvinceRecord {
    /// Запись со всеми показателями; не указанные заполняются нулём
    pub fn from_pairs(name: &str, values: &[(Indicator, f64)]) -> Self {
        let mut indicators: BTreeMap<Indicator, f64> =
            Indicator::ALL.into_iter().map(|i| (i, 0.0)).collect();
        for &(indicator, value) in values {
            indicators.insert(indicator, value);
        }
        Self {
            name: name.to_string(),
            indicators,
            cluster: None,
        }
    }

    pub fn value(&self, indicator: Indicator) -> f64 {
        self.indicators.get(&indicator).copied().unwrap_or(0.0)
    }

    pub fn with_cluster(&self, label: usize) -> Self {
        Self {
            cluster: Some(label),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedSet {
    pub records: Vec<ProvinceRecord>,
    /// Количество пропусков по колонкам (только для наблюдаемости)
    pub missing_counts: BTreeMap<String, usize>,
    /// Отклонённые строки (только при политике SkipRow)
    #[serde(default)]
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub indicator: Indicator,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub indicators: Vec<Indicator>,
    /// NaN (в JSON null) для показателей с нулевой дисперсией
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Indicator, b: Indicator) -> Option<f64> {
        let i = self.indicators.iter().position(|&x| x == a)?;
        let j = self.indicators.iter().position(|&x| x == b)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fences {
    pub indicator: Indicator,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// Граничные значения не считаются выбросами
    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlag {
    pub name: String,
    pub triggered: Vec<(Indicator, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub fences: Vec<Fences>,
    pub flagged: Vec<OutlierFlag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterOutput {
    pub k: usize,
    pub features: Vec<Indicator>,
    pub labels: Vec<(String, usize)>,
    pub centroids: Vec<Vec<f64>>,
    pub members: Vec<Vec<String>>,
    pub iterations: usize,
    pub converged: bool,
}

pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// [min_x, min_y, max_x, max_y]
    pub fn bounding_box(&self) -> Option<[f64; 4]> {
        let positions: Vec<&Position> = match self {
            Geometry::Polygon(rings) => rings.iter().flatten().collect(),
            Geometry::MultiPolygon(polygons) => polygons.iter().flatten().flatten().collect(),
        };

        positions
            .into_iter()
            .filter(|p| p.len() >= 2)
            .fold(None, |acc, p| {
                let [x, y] = [p[0], p[1]];
                Some(match acc {
                    None => [x, y, x, y],
                    Some([a, b, c, d]) => [a.min(x), b.min(y), c.max(x), d.max(y)],
                })
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub name: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedRow {
    pub name: String,
    pub geometry: Geometry,
    /// Значение для раскраски карты
    pub value: f64,
    pub indicators: BTreeMap<Indicator, f64>,
}

/// Провинция без геометрии после разрешения псевдонимов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMismatch {
    pub source_name: String,
    pub resolved_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJoin {
    pub indicator: Indicator,
    pub matched: Vec<JoinedRow>,
    pub unmatched_geometry: Vec<String>,
    pub unmatched_provinces: Vec<JoinMismatch>,
    pub excluded: Vec<String>,
    pub rolled_up: Vec<String>,
    pub bounds: Option<[f64; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSample {
    pub input: f64,
    pub factor: f64,
    pub output: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub seed: u64,
    pub outputs: Vec<f64>,
    pub histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterOutput {
    pub x: Indicator,
    pub y: Indicator,
    pub points: Vec<ScatterPoint>,
    pub trend: Option<TrendLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<ProvinceRecord>,
    pub missing_counts: BTreeMap<String, usize>,
    pub rejected_rows: Vec<String>,
    pub descriptive: Option<Vec<DescriptiveStats>>,
    pub correlation: Option<CorrelationMatrix>,
    pub outliers: Option<OutlierReport>,
    pub ranking: Option<Vec<RankedValue>>,
    pub scatter: Option<ScatterOutput>,
    pub clusters: Option<ClusterOutput>,
    pub geo: Option<GeoJoin>,
    pub simulation: Option<SimulationOutput>,
    pub warnings: Vec<String>,
    pub failures: Vec<StageFailure>,
}
