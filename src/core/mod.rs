pub mod assembler;
pub mod builder;
pub mod coercer;
pub mod etl;
pub mod loader;
pub mod normalizer;

pub use crate::domain::model::{Feature, FeatureCollection, RawRecord, TransformResult};
pub use crate::domain::ports::{FeatureBuilder, Pipeline, SinkConnector, SpatialSink, Storage};
pub use crate::utils::error::Result;
