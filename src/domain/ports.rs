use crate::domain::model::{
    DestinationSchema, Extracted, Feature, LoadPolicy, LoadReport, RawRecord, SpatialRow,
    TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extracted>;
    async fn transform(&self, extracted: Extracted) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadReport>;
}

/// Maps one source row to a feature. `EtlError::SkipRecord` drops the row;
/// any other error aborts the batch.
pub trait FeatureBuilder: Send + Sync {
    fn build(&self, record: &RawRecord) -> Result<Feature>;
}

/// One open connection to a spatial store. A sink is used for a single load
/// and closed afterwards.
#[async_trait]
pub trait SpatialSink: Send {
    async fn begin(&mut self) -> Result<()>;

    /// Create the destination table according to `policy`, with the geometry
    /// column bound to the schema's SRID.
    async fn prepare_table(&mut self, schema: &DestinationSchema, policy: LoadPolicy) -> Result<()>;

    async fn insert(&mut self, schema: &DestinationSchema, row: &SpatialRow) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn row_count(&mut self, table: &str) -> Result<u64>;

    async fn close(&mut self) -> Result<()>;
}

/// Holds connection settings and hands out a fresh sink per load.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    type Sink: SpatialSink;

    async fn connect(&self) -> Result<Self::Sink>;
}
