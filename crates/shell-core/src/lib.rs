//! Tablet back-shell generation
//!
//! This crate turns a table of millimeter parameters into two printable
//! shell halves:
//! - Frame blank with tablet pocket, lip, bottom cutout and webcam hole
//! - Position-based edge selection and fillet passes
//! - Bisection with an optional weld groove
//! - Port, kickstand and ventilation cutouts
//! - Optional mirrored text engraving
//! - STL and JSON report export

pub mod bisect;
pub mod constants;
pub mod cutouts;
pub mod document;
pub mod engrave;
pub mod error;
pub mod export;
pub mod fillet;
pub mod frame;
pub mod params;
pub mod pipeline;

pub use document::{Document, DocumentObject};
pub use error::{ShellError, ShellResult};
pub use export::{ExportError, export_visible, save_stl, write_report};
pub use fillet::{EdgeClass, FilletOutcome, FilletPass, FilletRecord};
pub use params::{Dimensions, ParamsError, ShellParams, TextParams, WeldGroove};
pub use pipeline::{EngravingStatus, GenerationReport, ShellGenerator, ShellOutput, Variant};
