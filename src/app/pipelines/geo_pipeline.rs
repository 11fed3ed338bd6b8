use crate::adapters::csv_source::{read_records, write_clean_route_stops};
use crate::adapters::geojson::{from_geojson_str, to_geojson_string};
use crate::config::toml_config::JobConfig;
use crate::core::assembler::assemble;
use crate::core::loader::SpatialLoader;
use crate::domain::model::{Extracted, LoadReport, TransformResult};
use crate::domain::ports::{FeatureBuilder, Pipeline, SinkConnector, Storage};
use crate::utils::error::{EtlError, Result};

/// One job: read an export, build features, write the interchange files and
/// load the result into the job's table.
pub struct GeoPipeline<S: Storage, B: FeatureBuilder, C: SinkConnector> {
    storage: S,
    builder: B,
    loader: SpatialLoader<C>,
    job: JobConfig,
}

impl<S: Storage, B: FeatureBuilder, C: SinkConnector> GeoPipeline<S, B, C> {
    pub fn new(storage: S, builder: B, connector: C, job: JobConfig) -> Self {
        Self {
            storage,
            builder,
            loader: SpatialLoader::new(connector),
            job,
        }
    }

    fn collection_name(&self) -> String {
        self.job.schema().table
    }
}

#[async_trait::async_trait]
impl<S: Storage, B: FeatureBuilder, C: SinkConnector> Pipeline for GeoPipeline<S, B, C> {
    async fn extract(&self) -> Result<Extracted> {
        let data = self.storage.read_file(&self.job.input).await?;

        if self.job.reads_geojson() {
            let content = String::from_utf8(data).map_err(|e| EtlError::ValidationError {
                message: format!("{} is not valid UTF-8: {}", self.job.input, e),
            })?;
            return Ok(Extracted::Collection(from_geojson_str(&content)?));
        }

        Ok(Extracted::Table(read_records(&data)?))
    }

    async fn transform(&self, extracted: Extracted) -> Result<TransformResult> {
        let result = match extracted {
            Extracted::Table(table) => {
                let assembled = assemble(&table.records, &self.builder, Some(self.collection_name()))?;

                if let Some(path) = &self.job.clean_csv_output {
                    let cleaned = write_clean_route_stops(&table)?;
                    self.storage.write_file(path, &cleaned).await?;
                    tracing::info!("Clean CSV written to {}", path);
                }

                TransformResult {
                    input_records: table.records.len(),
                    skipped_records: assembled.skipped,
                    collection: assembled.collection,
                }
            }
            Extracted::Collection(mut collection) => {
                if collection.name.is_none() {
                    collection.name = Some(self.collection_name());
                }
                TransformResult {
                    input_records: collection.len(),
                    skipped_records: 0,
                    collection,
                }
            }
        };

        if let Some(path) = &self.job.geojson_output {
            let content = to_geojson_string(&result.collection)?;
            self.storage.write_file(path, content.as_bytes()).await?;
            tracing::info!("GeoJSON written to {}", path);
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<LoadReport> {
        self.loader
            .load(&result.collection, &self.job.schema(), self.job.policy())
            .await
    }
}
