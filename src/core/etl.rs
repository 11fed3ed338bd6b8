use crate::domain::model::LoadReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<LoadReport> {
        tracing::info!("Extracting...");
        let extracted = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", extracted.len());

        let result = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "Built {} features ({} of {} records skipped)",
            result.collection.len(),
            result.skipped_records,
            result.input_records
        );

        let report = self.pipeline.load(result).await?;
        tracing::info!(
            "Loaded {} rows into '{}' ({} policy)",
            report.inserted,
            report.table,
            report.policy
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Extracted, Feature, FeatureCollection, GeoCoordinate, LoadPolicy, Properties, SourceTable,
        TransformResult,
    };
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        fail_transform: bool,
        loaded: AtomicBool,
    }

    impl StubPipeline {
        fn new(fail_transform: bool) -> Self {
            Self {
                fail_transform,
                loaded: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Extracted> {
            Ok(Extracted::Table(SourceTable::default()))
        }

        async fn transform(&self, _extracted: Extracted) -> Result<TransformResult> {
            if self.fail_transform {
                return Err(EtlError::ParseError {
                    value: "x".to_string(),
                    reason: "stub".to_string(),
                });
            }
            let feature = Feature::point(GeoCoordinate::new(37.0, 32.0), Properties::new());
            Ok(TransformResult {
                collection: FeatureCollection::new(None, vec![feature]),
                input_records: 2,
                skipped_records: 1,
            })
        }

        async fn load(&self, result: TransformResult) -> Result<LoadReport> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(LoadReport {
                table: "stub".to_string(),
                policy: LoadPolicy::Append,
                inserted: result.collection.len() as u64,
                table_rows: result.collection.len() as u64,
            })
        }
    }

    #[tokio::test]
    async fn test_run_passes_phases_through() {
        let engine = EtlEngine::new(StubPipeline::new(false));
        let report = engine.run().await.unwrap();

        assert_eq!(report.inserted, 1);
        assert!(engine.pipeline().loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_transform_failure_skips_load() {
        let engine = EtlEngine::new(StubPipeline::new(true));

        assert!(engine.run().await.is_err());
        assert!(!engine.pipeline().loaded.load(Ordering::SeqCst));
    }
}
