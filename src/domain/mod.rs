// Domain layer: core types, per-domain specs and the classifier port.

pub mod model;
pub mod ports;
pub mod registry;
pub mod spec;
