use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_identifier;
use geo::{Geometry, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// SRID of WGS 84 longitude/latitude, the only reference system the tables use.
pub const WGS84_SRID: u32 = 4326;

/// One CSV row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(data: HashMap<String, String>) -> Self {
        Self { data }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.data.get(column).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// x is longitude, y is latitude.
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

pub type Properties = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub properties: Properties,
    pub geometry: Geometry<f64>,
}

impl Feature {
    pub fn point(coordinate: GeoCoordinate, properties: Properties) -> Self {
        Self {
            properties,
            geometry: Geometry::Point(coordinate.to_point()),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub name: Option<String>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(name: Option<String>, features: Vec<Feature>) -> Self {
        Self { name, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) | Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Type modifier used in `GEOMETRY(<kind>, <srid>)` column declarations.
    pub fn postgis_name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.postgis_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            column_type: ColumnType::Text,
        }
    }

    pub fn integer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            column_type: ColumnType::Integer,
        }
    }
}

/// Shape of a destination table. Every table also carries a serial `id` and a
/// `geometry` column; `columns` lists the property columns in insert order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSchema {
    pub table: String,
    pub columns: Vec<Column>,
    pub geometry_type: GeometryKind,
    pub srid: u32,
}

impl DestinationSchema {
    pub fn new(table: &str, columns: Vec<Column>, geometry_type: GeometryKind) -> Result<Self> {
        validate_identifier("schema.table", table)?;
        for column in &columns {
            validate_identifier("schema.columns", &column.name)?;
            if matches!(column.name.as_str(), "id" | "geometry") {
                return Err(EtlError::InvalidConfigValueError {
                    field: "schema.columns".to_string(),
                    value: column.name.clone(),
                    reason: "Reserved column name".to_string(),
                });
            }
        }

        Ok(Self {
            table: table.to_string(),
            columns,
            geometry_type,
            srid: WGS84_SRID,
        })
    }

    pub fn route_stops() -> Self {
        Self {
            table: "hat_guzergah".to_string(),
            columns: vec![Column::integer("hat_no")],
            geometry_type: GeometryKind::Point,
            srid: WGS84_SRID,
        }
    }

    pub fn points_of_interest() -> Self {
        Self {
            table: "turistik_konumlar".to_string(),
            columns: vec![
                Column::text("tur"),
                Column::text("isim"),
                Column::text("icerik"),
                Column::text("resim"),
            ],
            geometry_type: GeometryKind::Point,
            srid: WGS84_SRID,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// Drop and recreate the table, so repeated runs converge on the same rows.
    Replace,
    /// Create the table only if missing; every run adds its rows.
    Append,
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPolicy::Replace => f.write_str("replace"),
            LoadPolicy::Append => f.write_str("append"),
        }
    }
}

/// Which export a job reads; decides the builder, table and default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    RouteStops,
    PointsOfInterest,
}

impl SourceKind {
    pub fn schema(&self) -> DestinationSchema {
        match self {
            SourceKind::RouteStops => DestinationSchema::route_stops(),
            SourceKind::PointsOfInterest => DestinationSchema::points_of_interest(),
        }
    }

    /// Route stops are reloaded in full every run; points of interest accumulate.
    pub fn default_policy(&self) -> LoadPolicy {
        match self {
            SourceKind::RouteStops => LoadPolicy::Replace,
            SourceKind::PointsOfInterest => LoadPolicy::Append,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::RouteStops => f.write_str("route_stops"),
            SourceKind::PointsOfInterest => f.write_str("points_of_interest"),
        }
    }
}

/// Rows of a CSV export together with its header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// What a pipeline pulled from its input file.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Table(SourceTable),
    /// Already converted features, e.g. a GeoJSON file from an earlier run.
    Collection(FeatureCollection),
}

impl Extracted {
    pub fn len(&self) -> usize {
        match self {
            Extracted::Table(table) => table.records.len(),
            Extracted::Collection(collection) => collection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A row ready for insertion: property values in schema column order and the
/// coerced geometry as WKT.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRow {
    pub values: Vec<Option<String>>,
    pub wkt: String,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub collection: FeatureCollection,
    pub input_records: usize,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub policy: LoadPolicy,
    pub inserted: u64,
    pub table_rows: u64,
}
