// Adapters layer: concrete implementations for external systems (files, spatial stores).

pub mod csv_source;
pub mod geojson;
pub mod memory;
pub mod postgres;
