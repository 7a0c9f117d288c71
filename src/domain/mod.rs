// Domain layer: document model, value types and ports. No I/O here.

pub mod document;
pub mod model;
pub mod ports;
