use crate::core::normalizer::normalize;
use crate::domain::model::{Feature, GeoCoordinate, Properties, RawRecord};
use crate::domain::ports::FeatureBuilder;
use crate::utils::error::{EtlError, Result};

pub const HAT_NO: &str = "HAT_NO";
pub const KOORDINAT_X: &str = "KOORDINAT_X";
pub const KOORDINAT_Y: &str = "KOORDINAT_Y";
/// Direction column of the route export; never carried into features.
pub const YON: &str = "YON";

pub const ENLEM: &str = "enlem";
pub const BOYLAM: &str = "boylam";
pub const POI_PROPERTIES: [&str; 4] = ["tur", "isim", "icerik", "resim"];

/// Bus route stops. Coordinates go through [`normalize`]; `KOORDINAT_X`
/// holds the latitude and `KOORDINAT_Y` the longitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteStopBuilder;

impl RouteStopBuilder {
    fn coordinate(record: &RawRecord, column: &str) -> Result<f64> {
        let raw = record.get(column).ok_or_else(|| EtlError::MissingField {
            field: column.to_string(),
        })?;

        normalize(Some(raw))?.ok_or_else(|| EtlError::ParseError {
            value: raw.to_string(),
            reason: format!("{} is empty", column),
        })
    }
}

impl FeatureBuilder for RouteStopBuilder {
    fn build(&self, record: &RawRecord) -> Result<Feature> {
        let hat_no = record.get(HAT_NO).ok_or_else(|| EtlError::MissingField {
            field: HAT_NO.to_string(),
        })?;

        let latitude = Self::coordinate(record, KOORDINAT_X)?;
        let longitude = Self::coordinate(record, KOORDINAT_Y)?;

        let mut properties = Properties::new();
        properties.insert("hat_no".to_string(), Some(hat_no.to_string()));

        Ok(Feature::point(
            GeoCoordinate::new(latitude, longitude),
            properties,
        ))
    }
}

/// Points of interest. Coordinates are plain decimals; rows where either one
/// does not parse are skipped rather than repaired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointOfInterestBuilder;

impl PointOfInterestBuilder {
    fn coordinate(record: &RawRecord, column: &str) -> Result<f64> {
        let raw = record.get(column).ok_or_else(|| EtlError::SkipRecord {
            reason: format!("{} is missing", column),
        })?;

        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(EtlError::SkipRecord {
                reason: format!("{} '{}' is not a number", column, raw),
            }),
        }
    }
}

impl FeatureBuilder for PointOfInterestBuilder {
    fn build(&self, record: &RawRecord) -> Result<Feature> {
        let latitude = Self::coordinate(record, ENLEM)?;
        let longitude = Self::coordinate(record, BOYLAM)?;

        let properties: Properties = POI_PROPERTIES
            .iter()
            .map(|key| (key.to_string(), record.get(key).map(str::to_string)))
            .collect();

        Ok(Feature::point(
            GeoCoordinate::new(latitude, longitude),
            properties,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};

    fn route_row(hat_no: &str, x: &str, y: &str) -> RawRecord {
        [(HAT_NO, hat_no), (KOORDINAT_X, x), (KOORDINAT_Y, y), (YON, "G")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_route_stop_feature() {
        let feature = RouteStopBuilder
            .build(&route_row("5", "37876543", "32493322"))
            .unwrap();

        assert_eq!(feature.geometry, Geometry::Point(Point::new(32.493322, 37.876543)));
        assert_eq!(feature.property("hat_no"), Some("5"));
        assert_eq!(feature.properties.len(), 1);
    }

    #[test]
    fn test_route_stop_bad_coordinate_is_fatal() {
        let err = RouteStopBuilder
            .build(&route_row("5", "3x876543", "32493322"))
            .unwrap_err();
        assert!(matches!(err, EtlError::ParseError { .. }));
        assert!(!err.is_skippable());
    }

    #[test]
    fn test_route_stop_infinite_coordinate_is_fatal() {
        let err = RouteStopBuilder
            .build(&route_row("5", "37876543", "99e999"))
            .unwrap_err();
        assert!(matches!(err, EtlError::ParseError { .. }));
    }

    #[test]
    fn test_route_stop_empty_coordinate_is_fatal() {
        let err = RouteStopBuilder.build(&route_row("5", "", "32493322")).unwrap_err();
        assert!(matches!(err, EtlError::ParseError { .. }));
    }

    #[test]
    fn test_route_stop_missing_column() {
        let record: RawRecord = [(HAT_NO, "5"), (KOORDINAT_X, "37876543")].into_iter().collect();
        let err = RouteStopBuilder.build(&record).unwrap_err();
        match err {
            EtlError::MissingField { field } => assert_eq!(field, KOORDINAT_Y),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_point_of_interest_feature() {
        let record: RawRecord = [
            ("enlem", "37.8719"),
            ("boylam", "32.5047"),
            ("tur", "cami"),
            ("isim", "Alaeddin Camii"),
            ("icerik", "Selçuklu dönemi"),
            ("resim", "data:image/webp;base64,AAAA"),
        ]
        .into_iter()
        .collect();

        let feature = PointOfInterestBuilder.build(&record).unwrap();

        assert_eq!(feature.geometry, Geometry::Point(Point::new(32.5047, 37.8719)));
        assert_eq!(feature.property("isim"), Some("Alaeddin Camii"));
        assert_eq!(feature.property("icerik"), Some("Selçuklu dönemi"));
        assert_eq!(feature.property("resim"), Some("data:image/webp;base64,AAAA"));
    }

    #[test]
    fn test_point_of_interest_missing_property_is_null() {
        let record: RawRecord = [("enlem", "37.8"), ("boylam", "32.5"), ("isim", "Mevlana")]
            .into_iter()
            .collect();

        let feature = PointOfInterestBuilder.build(&record).unwrap();
        assert_eq!(feature.properties.get("tur"), Some(&None));
        assert_eq!(feature.properties.len(), 4);
    }

    #[test]
    fn test_point_of_interest_bad_coordinate_is_skipped() {
        for (enlem, boylam) in [("abc", "32.5"), ("37.8", ""), ("NaN", "32.5"), ("inf", "32.5")] {
            let record: RawRecord = [("enlem", enlem), ("boylam", boylam)].into_iter().collect();
            let err = PointOfInterestBuilder.build(&record).unwrap_err();
            assert!(err.is_skippable(), "{} {}", enlem, boylam);
        }

        let record: RawRecord = [("boylam", "32.5")].into_iter().collect();
        assert!(PointOfInterestBuilder.build(&record).unwrap_err().is_skippable());
    }
}
