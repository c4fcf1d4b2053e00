// Domain layer: category tree, series and model types plus the ports (interfaces) the core depends on.

pub mod model;
pub mod ports;
