//! Command line options

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shell_cad::{CadKernel, default_kernel};

/// Generate a two-part tablet back shell
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "tabshell", version, about)]
pub struct Options {
    /// Load parameters from a RON file
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Output directory
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out: PathBuf,

    /// Engrave the configured text into the left half
    #[arg(long)]
    pub engrave: bool,

    /// Font used for engraving (implies --engrave)
    #[arg(long, value_name = "PATH")]
    pub font: Option<String>,

    /// Text to engrave (implies --engrave)
    #[arg(long, value_name = "STR")]
    pub text: Option<String>,

    /// Tessellation cell size for STL export
    #[arg(long, value_name = "MM", value_parser = parse_resolution)]
    pub resolution: Option<f64>,

    /// Cut a V-groove along the seam
    #[arg(long)]
    pub weld_groove: bool,

    /// Generate only, write no files
    #[arg(long)]
    pub no_export: bool,

    /// Geometry backend
    #[arg(long, value_enum, default_value_t = KernelChoice::Csg)]
    pub kernel: KernelChoice,
}

impl Options {
    pub fn engraved(&self) -> bool {
        self.engrave || self.font.is_some() || self.text.is_some()
    }
}

/// Selectable geometry backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KernelChoice {
    /// Built-in CSG kernel, the only backend with fillets
    Csg,
    /// Truck B-Rep kernel; every fillet pass is skipped
    #[cfg(feature = "truck")]
    Truck,
}

impl KernelChoice {
    pub fn build(self) -> Box<dyn CadKernel> {
        match self {
            KernelChoice::Csg => default_kernel(),
            #[cfg(feature = "truck")]
            KernelChoice::Truck => {
                tracing::warn!("Truck kernel has no fillets, edges stay sharp");
                Box::new(shell_cad::TruckKernel::new())
            }
        }
    }
}

fn parse_resolution(value: &str) -> Result<f64, String> {
    let resolution: f64 = value
        .parse()
        .map_err(|_| format!("invalid resolution `{value}`"))?;
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(format!("resolution must be positive, got {resolution}"));
    }
    Ok(resolution)
}
