//! GeoJSON interchange files.
//!
//! A collection's `name` is written as a foreign member next to `features`,
//! the way desktop GIS tools name their exports.

use crate::domain::model::{Feature, FeatureCollection, Properties};
use crate::utils::error::{EtlError, Result};
use geo::Geometry;
use geojson::{GeoJson, JsonObject, JsonValue};

pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
            id: None,
            properties: Some(properties_to_json(&feature.properties)),
            foreign_members: None,
        })
        .collect();

    let foreign_members = collection.name.as_ref().map(|name| {
        let mut members = JsonObject::new();
        members.insert("name".to_string(), JsonValue::String(name.clone()));
        members
    });

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_geojson(collection))?)
}

pub fn from_geojson_str(content: &str) -> Result<FeatureCollection> {
    match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => {
            let name = fc
                .foreign_members
                .as_ref()
                .and_then(|members| members.get("name"))
                .and_then(JsonValue::as_str)
                .map(str::to_string);

            let features = fc
                .features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| convert_feature(index, feature))
                .collect::<Result<Vec<_>>>()?;

            Ok(FeatureCollection::new(name, features))
        }
        GeoJson::Feature(feature) => Ok(FeatureCollection::new(None, vec![convert_feature(0, feature)?])),
        GeoJson::Geometry(_) => Err(EtlError::ValidationError {
            message: "Expected a FeatureCollection, found a bare geometry".to_string(),
        }),
    }
}

fn convert_feature(index: usize, feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature.geometry.ok_or_else(|| EtlError::GeometryError {
        message: format!("feature {} has no geometry", index + 1),
    })?;
    let geometry = Geometry::<f64>::try_from(geometry)?;

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, json_to_property(value)))
        .collect();

    Ok(Feature {
        properties,
        geometry,
    })
}

fn properties_to_json(properties: &Properties) -> JsonObject {
    properties
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Some(v) => JsonValue::String(v.clone()),
                None => JsonValue::Null,
            };
            (key.clone(), value)
        })
        .collect()
}

fn json_to_property(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
