// Domain layer: data model, exact amounts and ports (interfaces).
// No I/O here; everything is created per shopping-list request.

pub mod amount;
pub mod model;
pub mod ports;
