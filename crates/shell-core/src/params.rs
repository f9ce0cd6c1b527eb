//! Shell parameters and derived dimensions
//!
//! All values are millimeters. Every derived dimension is a linear function
//! of [`ShellParams`], computed once by [`Dimensions::from_params`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FONT_PATH, ENGRAVE_EXTRA_DEPTH, ENGRAVE_Z_NUDGE};

/// Tablet body size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabletSize {
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
}

impl Default for TabletSize {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 204.0,
            thickness: 15.0,
        }
    }
}

/// Retaining lip above the tablet pocket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lip {
    /// Overhang on the left, right and top sides
    pub overhang: f64,
    /// Overhang on the bottom side
    pub overhang_bottom: f64,
    /// Lip thickness above the tablet space
    pub vertical: f64,
}

impl Default for Lip {
    fn default() -> Self {
        Self {
            overhang: 3.0,
            overhang_bottom: 9.0,
            vertical: 3.0,
        }
    }
}

/// Material-saving cutout in the bottom wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BottomCutout {
    pub margin: f64,
    /// Solid band kept below the top cavity edge
    pub solid_top: f64,
    /// Solid band kept above the bottom cavity edge
    pub solid_bottom: f64,
}

impl Default for BottomCutout {
    fn default() -> Self {
        Self {
            margin: 10.0,
            solid_top: 40.0,
            solid_bottom: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Webcam {
    pub from_top: f64,
    pub from_side: f64,
    pub radius: f64,
}

impl Default for Webcam {
    fn default() -> Self {
        Self {
            from_top: 18.0,
            from_side: 18.0,
            radius: 6.0,
        }
    }
}

/// Fillet radius per edge class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilletRadii {
    pub inner_corner: f64,
    pub outer_corner: f64,
    pub outer_edge: f64,
}

impl Default for FilletRadii {
    fn default() -> Self {
        Self {
            inner_corner: 5.0,
            outer_corner: 5.0,
            outer_edge: 1.5,
        }
    }
}

/// A port slot cut through a side wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortSlot {
    /// Distance from the top cavity edge to the far end of the slot
    pub from_top: f64,
    pub length: f64,
}

impl PortSlot {
    pub const fn new(from_top: f64, length: f64) -> Self {
        Self { from_top, length }
    }
}

/// Notch for the kickstand hinge, measured from the top cavity edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kickstand {
    pub start: f64,
    pub end: f64,
    pub width: f64,
}

impl Default for Kickstand {
    fn default() -> Self {
        Self {
            start: 100.0,
            end: 155.0,
            width: 10.0,
        }
    }
}

/// Cutout layout of one side wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideLayout {
    pub ports: Vec<PortSlot>,
    pub kickstand: Kickstand,
}

impl SideLayout {
    pub fn left() -> Self {
        Self {
            ports: vec![PortSlot::new(23.0, 74.0), PortSlot::new(145.0, 20.0)],
            kickstand: Kickstand::default(),
        }
    }

    pub fn right() -> Self {
        Self {
            ports: vec![PortSlot::new(20.0, 72.0), PortSlot::new(138.0, 37.0)],
            kickstand: Kickstand::default(),
        }
    }
}

impl Default for SideLayout {
    fn default() -> Self {
        Self::left()
    }
}

/// Ventilation holes through the top wall, measured along X from each side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vents {
    pub start: f64,
    pub end: f64,
    pub radius: f64,
    pub spacing: f64,
    pub wall_depth: f64,
}

impl Default for Vents {
    fn default() -> Self {
        Self {
            start: 15.0,
            end: 80.0,
            radius: 3.0,
            spacing: 8.0,
            wall_depth: 8.0,
        }
    }
}

/// V-groove along the seam between the halves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldGroove {
    pub width: f64,
    pub depth: f64,
    pub inset: f64,
}

impl Default for WeldGroove {
    fn default() -> Self {
        Self {
            width: 1.5,
            depth: 1.8,
            inset: 1.5,
        }
    }
}

/// Text engraved into the outside of the bottom wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParams {
    pub text: String,
    pub font: String,
    pub size: f64,
    pub depth: f64,
    pub x_offset: f64,
    pub y_offset: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            text: "ATLOG".to_string(),
            font: DEFAULT_FONT_PATH.to_string(),
            size: 15.0,
            depth: 1.0,
            x_offset: 15.0,
            y_offset: 15.0,
        }
    }
}

impl TextParams {
    /// Height of the top of the engraving cutter above z = 0
    pub fn cutter_top(&self) -> f64 {
        self.depth + ENGRAVE_EXTRA_DEPTH - ENGRAVE_Z_NUDGE
    }

    /// The cutter must stay inside a bottom wall of thickness `wall`
    pub fn validate(&self, wall: f64) -> Result<(), ParamsError> {
        for (name, value) in [("text.size", self.size), ("text.depth", self.depth)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamsError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.cutter_top() >= wall {
            return Err(ParamsError::Invalid(format!(
                "text.depth {} cuts through the {} mm bottom wall",
                self.depth, wall
            )));
        }
        Ok(())
    }
}

/// Full parameter table of the shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellParams {
    pub tablet: TabletSize,
    pub wall: f64,
    pub clearance: f64,
    /// Free height above the bottom wall for the tablet
    pub tablet_space: f64,
    pub lip: Lip,
    pub bottom_cutout: BottomCutout,
    pub webcam: Webcam,
    pub fillets: FilletRadii,
    /// How far port slots reach into the side walls
    pub port_cut_width: f64,
    pub left: SideLayout,
    pub right: SideLayout,
    pub vents: Vents,
    pub weld_groove: Option<WeldGroove>,
    pub text: TextParams,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self {
            tablet: TabletSize::default(),
            wall: 3.0,
            clearance: 0.5,
            tablet_space: 15.0,
            lip: Lip::default(),
            bottom_cutout: BottomCutout::default(),
            webcam: Webcam::default(),
            fillets: FilletRadii::default(),
            port_cut_width: 8.0,
            left: SideLayout::left(),
            right: SideLayout::right(),
            vents: Vents::default(),
            weld_groove: None,
            text: TextParams::default(),
        }
    }
}

impl ShellParams {
    /// Check values that would make generation loop or produce nonsense.
    /// Non-positive primitive sizes are left to the kernel to reject.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("wall", self.wall),
            ("tablet.width", self.tablet.width),
            ("tablet.height", self.tablet.height),
            ("tablet_space", self.tablet_space),
            ("vents.spacing", self.vents.spacing),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamsError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.clearance.is_finite() || self.clearance < 0.0 {
            return Err(ParamsError::Invalid(format!(
                "clearance must not be negative, got {}",
                self.clearance
            )));
        }
        self.text.validate(self.wall)
    }

    /// Save parameters to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let path = path.as_ref();
        let content = self.to_bytes()?;
        std::fs::write(path, content).map_err(|e| ParamsError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize parameters to RON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ParamsError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ParamsError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load parameters from a RON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ParamsError::Io(e.to_string()))?;
        let params: ShellParams =
            ron::from_str(&content).map_err(|e| ParamsError::Deserialize(e.to_string()))?;
        Ok(params)
    }
}

/// Dimensions derived from [`ShellParams`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub cavity_w: f64,
    pub cavity_h: f64,
    pub outer_w: f64,
    pub outer_h: f64,
    pub total_height: f64,
}

impl Dimensions {
    pub fn from_params(params: &ShellParams) -> Self {
        let cavity_w = params.tablet.width + 2.0 * params.clearance;
        let cavity_h = params.tablet.height + 2.0 * params.clearance;
        Self {
            cavity_w,
            cavity_h,
            outer_w: cavity_w + 2.0 * params.wall,
            outer_h: cavity_h + 2.0 * params.wall,
            total_height: params.wall + params.tablet_space + params.lip.vertical,
        }
    }

    /// X coordinate of the split plane
    pub fn split_x(&self) -> f64 {
        self.outer_w / 2.0
    }
}

/// Parameter loading errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParamsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Invalid parameter: {0}")]
    Invalid(String),
}
