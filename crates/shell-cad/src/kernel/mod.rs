//! CAD kernel abstraction and backends

mod csg;
mod traits;

#[cfg(feature = "truck")]
mod truck;

pub use csg::{CsgKernel, KernelConfig};
pub use traits::*;

#[cfg(feature = "truck")]
pub use truck::TruckKernel;
