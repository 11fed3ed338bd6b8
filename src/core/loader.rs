use crate::core::coercer::coerce;
use crate::domain::model::{
    DestinationSchema, Feature, FeatureCollection, LoadPolicy, LoadReport, SpatialRow,
};
use crate::domain::ports::{SinkConnector, SpatialSink};
use crate::utils::error::Result;

/// Writes feature collections into a spatial table.
///
/// Each [`load`](SpatialLoader::load) opens its own sink, issues one insert
/// per feature inside a single unit of work and commits once at the end. A
/// failure rolls back that unit of work and aborts the rest of the batch;
/// nothing is retried. Nothing after the commit can fail the load.
pub struct SpatialLoader<C: SinkConnector> {
    connector: C,
}

impl<C: SinkConnector> SpatialLoader<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub async fn load(
        &self,
        collection: &FeatureCollection,
        schema: &DestinationSchema,
        policy: LoadPolicy,
    ) -> Result<LoadReport> {
        tracing::info!(
            "Loading {} features into '{}' ({} policy)",
            collection.len(),
            schema.table,
            policy
        );

        let mut sink = self.connector.connect().await?;

        match Self::write_batch(&mut sink, collection, schema, policy).await {
            Ok(report) => {
                // Already committed.
                if let Err(close_err) = sink.close().await {
                    tracing::warn!("Closing the sink failed: {}", close_err);
                }
                tracing::info!(
                    "Committed {} rows, '{}' now holds {} rows",
                    report.inserted,
                    report.table,
                    report.table_rows
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Load into '{}' aborted: {}", schema.table, e);
                if let Err(rollback_err) = sink.rollback().await {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                if let Err(close_err) = sink.close().await {
                    tracing::warn!("Closing the sink failed: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn write_batch(
        sink: &mut C::Sink,
        collection: &FeatureCollection,
        schema: &DestinationSchema,
        policy: LoadPolicy,
    ) -> Result<LoadReport> {
        sink.begin().await?;
        sink.prepare_table(schema, policy).await?;

        let mut inserted = 0u64;
        for feature in &collection.features {
            let row = to_row(feature, schema)?;
            sink.insert(schema, &row).await?;
            inserted += 1;
        }

        let table_rows = sink.row_count(&schema.table).await?;
        sink.commit().await?;

        Ok(LoadReport {
            table: schema.table.clone(),
            policy,
            inserted,
            table_rows,
        })
    }
}

/// Lays a feature out in the schema's column order with its geometry
/// coerced to the column type.
pub fn to_row(feature: &Feature, schema: &DestinationSchema) -> Result<SpatialRow> {
    let values = schema
        .columns
        .iter()
        .map(|column| feature.properties.get(&column.name).cloned().flatten())
        .collect();

    Ok(SpatialRow {
        values,
        wkt: coerce(&feature.geometry, schema.geometry_type)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryConnector, MemorySpatialStore};
    use crate::domain::model::{GeoCoordinate, Properties};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use geo::{polygon, Geometry, Point};
    use std::sync::{Arc, Mutex};
    use wkt::TryFromWkt;

    #[derive(Debug, Default)]
    struct Calls {
        inserted: u64,
        committed: bool,
        rolled_back: bool,
        closed: bool,
    }

    /// Sink that records what the loader asked of it and fails on request.
    struct ScriptedSink {
        calls: Arc<Mutex<Calls>>,
        fail_row_count: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl SpatialSink for ScriptedSink {
        async fn begin(&mut self) -> Result<()> {
            Ok(())
        }

        async fn prepare_table(&mut self, _schema: &DestinationSchema, _policy: LoadPolicy) -> Result<()> {
            Ok(())
        }

        async fn insert(&mut self, _schema: &DestinationSchema, _row: &SpatialRow) -> Result<()> {
            self.calls.lock().unwrap().inserted += 1;
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.calls.lock().unwrap().committed = true;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.calls.lock().unwrap().rolled_back = true;
            Ok(())
        }

        async fn row_count(&mut self, table: &str) -> Result<u64> {
            if self.fail_row_count {
                return Err(EtlError::load(table, "connection reset"));
            }
            Ok(self.calls.lock().unwrap().inserted)
        }

        async fn close(&mut self) -> Result<()> {
            self.calls.lock().unwrap().closed = true;
            if self.fail_close {
                return Err(EtlError::load("<close>", "connection reset"));
            }
            Ok(())
        }
    }

    struct ScriptedConnector {
        calls: Arc<Mutex<Calls>>,
        fail_row_count: bool,
        fail_close: bool,
    }

    impl ScriptedConnector {
        fn new(fail_row_count: bool, fail_close: bool) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Calls::default())),
                fail_row_count,
                fail_close,
            }
        }
    }

    #[async_trait]
    impl SinkConnector for ScriptedConnector {
        type Sink = ScriptedSink;

        async fn connect(&self) -> Result<ScriptedSink> {
            Ok(ScriptedSink {
                calls: self.calls.clone(),
                fail_row_count: self.fail_row_count,
                fail_close: self.fail_close,
            })
        }
    }

    fn stop(hat_no: &str) -> Feature {
        let mut properties = Properties::new();
        properties.insert("hat_no".to_string(), Some(hat_no.to_string()));
        Feature::point(GeoCoordinate::new(37.87, 32.49), properties)
    }

    #[test]
    fn test_row_follows_column_order() {
        let mut properties = Properties::new();
        properties.insert("resim".to_string(), None);
        properties.insert("isim".to_string(), Some("Mevlana".to_string()));
        properties.insert("tur".to_string(), Some("muze".to_string()));
        let feature = Feature::point(GeoCoordinate::new(37.87, 32.50), properties);

        let row = to_row(&feature, &DestinationSchema::points_of_interest()).unwrap();

        assert_eq!(
            row.values,
            vec![Some("muze".to_string()), Some("Mevlana".to_string()), None, None]
        );
        assert!(row.wkt.starts_with("POINT"));
    }

    #[test]
    fn test_row_collapses_polygon_for_point_table() {
        let feature = Feature {
            properties: Properties::new(),
            geometry: Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 2.0),
            ]),
        };

        let row = to_row(&feature, &DestinationSchema::route_stops()).unwrap();
        let point = Point::<f64>::try_from_wkt_str(&row.wkt).unwrap();
        assert!((point.x() - 1.0).abs() < 1e-9);
        assert!((point.y() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_load_commits_all_rows() {
        let store = MemorySpatialStore::new();
        let loader = SpatialLoader::new(MemoryConnector::new(store.clone()));
        let collection = FeatureCollection::new(None, vec![stop("1"), stop("2"), stop("3")]);

        let report = loader
            .load(&collection, &DestinationSchema::route_stops(), LoadPolicy::Replace)
            .await
            .unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.table_rows, 3);
        assert_eq!(store.row_count("hat_guzergah"), 3);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_aborts_and_rolls_back() {
        let store = MemorySpatialStore::new();
        let loader = SpatialLoader::new(MemoryConnector::new(store.clone()));
        let schema = DestinationSchema::route_stops();

        let first = FeatureCollection::new(None, vec![stop("1"), stop("2")]);
        loader.load(&first, &schema, LoadPolicy::Replace).await.unwrap();

        // hat_no is an INTEGER column
        let broken = FeatureCollection::new(None, vec![stop("3"), stop("on iki"), stop("4")]);
        let err = loader.load(&broken, &schema, LoadPolicy::Replace).await.unwrap_err();

        assert!(matches!(err, EtlError::LoadError { .. }));
        let hat_numbers: Vec<Option<String>> = store
            .rows("hat_guzergah")
            .into_iter()
            .map(|row| row.values[0].clone())
            .collect();
        assert_eq!(hat_numbers, vec![Some("1".to_string()), Some("2".to_string())]);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_sink_is_load_error() {
        let store = MemorySpatialStore::new();
        store.set_reachable(false);
        let loader = SpatialLoader::new(MemoryConnector::new(store.clone()));
        let collection = FeatureCollection::new(None, vec![stop("1")]);

        let err = loader
            .load(&collection, &DestinationSchema::route_stops(), LoadPolicy::Replace)
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::LoadError { .. }));
        assert!(!store.has_table("hat_guzergah"));
    }

    #[tokio::test]
    async fn test_row_count_failure_happens_before_commit() {
        let connector = ScriptedConnector::new(true, false);
        let calls = connector.calls.clone();
        let loader = SpatialLoader::new(connector);
        let collection = FeatureCollection::new(None, vec![stop("1"), stop("2")]);

        let err = loader
            .load(&collection, &DestinationSchema::route_stops(), LoadPolicy::Replace)
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::LoadError { .. }));
        let calls = calls.lock().unwrap();
        assert!(!calls.committed);
        assert!(calls.rolled_back);
        assert!(calls.closed);
    }

    #[tokio::test]
    async fn test_close_failure_after_commit_keeps_success() {
        let connector = ScriptedConnector::new(false, true);
        let calls = connector.calls.clone();
        let loader = SpatialLoader::new(connector);
        let collection = FeatureCollection::new(None, vec![stop("1"), stop("2")]);

        let report = loader
            .load(&collection, &DestinationSchema::route_stops(), LoadPolicy::Replace)
            .await
            .unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.table_rows, 2);
        let calls = calls.lock().unwrap();
        assert!(calls.committed);
        assert!(!calls.rolled_back);
    }
}
