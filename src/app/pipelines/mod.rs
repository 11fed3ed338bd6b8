pub mod geo_pipeline;

pub use geo_pipeline::GeoPipeline;

use crate::config::toml_config::JobConfig;
use crate::core::builder::{PointOfInterestBuilder, RouteStopBuilder};
use crate::core::etl::EtlEngine;
use crate::domain::model::{LoadReport, SourceKind};
use crate::domain::ports::{SinkConnector, Storage};
use crate::utils::error::Result;

/// Runs one configured job end to end with the builder its source needs.
pub async fn run_job<S, C>(storage: S, connector: C, job: JobConfig) -> Result<LoadReport>
where
    S: Storage,
    C: SinkConnector,
{
    tracing::info!("Running job '{}' ({} from {})", job.name, job.source, job.input);

    match job.source {
        SourceKind::RouteStops => {
            EtlEngine::new(GeoPipeline::new(storage, RouteStopBuilder, connector, job))
                .run()
                .await
        }
        SourceKind::PointsOfInterest => {
            EtlEngine::new(GeoPipeline::new(storage, PointOfInterestBuilder, connector, job))
                .run()
                .await
        }
    }
}
