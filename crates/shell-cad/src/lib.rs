//! CAD Kernel Abstraction and Font Outlines
//!
//! This crate provides:
//! - Abstract CAD kernel traits for solid modeling operations
//! - A pure Rust CSG kernel with exact membership, edge queries and fillets
//! - An optional Truck B-Rep backend (`truck` feature)
//! - Font outlining for engraved text

pub mod kernel;
pub mod text;

// Re-exports for convenience
pub use kernel::{
    BooleanType, BoundingBox, CadError, CadKernel, CadResult, CsgKernel, EdgeId, EdgeInfo,
    KernelConfig, NullKernel, Profile, SketchPlane, Solid, TessellatedMesh, Wire2D,
    default_kernel,
};
pub use text::{FontFile, GlyphSource, TextError};

#[cfg(feature = "truck")]
pub use kernel::TruckKernel;
