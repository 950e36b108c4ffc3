// Domain layer: parcel model and the ports the engine talks through.

pub mod model;
pub mod parcel;
pub mod ports;
