use crate::domain::model::GeometryKind;
use crate::utils::error::{EtlError, Result};
use geo::{Centroid, Geometry};
use wkt::ToWkt;

/// Renders `geometry` as WKT in the shape a destination column expects.
///
/// A Point column receives the centroid of any non-point input. Every other
/// combination is passed through unchanged; PostGIS rejects a mismatch at
/// insert time.
pub fn coerce(geometry: &Geometry<f64>, target: GeometryKind) -> Result<String> {
    let source = GeometryKind::of(geometry);

    if target == GeometryKind::Point && source != GeometryKind::Point {
        let centroid = geometry.centroid().ok_or_else(|| EtlError::GeometryError {
            message: format!("empty {} has no centroid", source),
        })?;
        tracing::trace!("Collapsed {} to centroid {:?}", source, centroid);
        return Ok(Geometry::Point(centroid).wkt_string());
    }

    Ok(geometry.wkt_string())
}
