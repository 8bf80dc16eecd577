// Domain layer: location records, run reports and the ports the pipeline is written against.

pub mod model;
pub mod ports;
pub mod report;
