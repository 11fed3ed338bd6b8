// Domain layer: models and ports. Concrete stores and file formats live in adapters.

pub mod model;
pub mod ports;
