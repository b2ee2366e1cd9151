// Domain layer: data model and ports (interfaces) shared by the render pipeline.

pub mod model;
pub mod ports;
