// Domain layer: entities and the record store port.

pub mod model;
pub mod ports;
