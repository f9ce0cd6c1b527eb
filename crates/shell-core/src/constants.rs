//! Global constants for shell-core

/// Extra height given to cavities so they cut cleanly through the top
pub const CAVITY_OVERSHOOT: f64 = 0.1;

/// Overshoot of the bottom cutout on each side of the bottom wall
pub const BOTTOM_CUT_OVERSHOOT: f64 = 0.05;

/// Distance through-cuts (ports, vents, notches) may reach past the outer
/// envelope
pub const THROUGH_CUT_OVERSHOOT: f64 = 1.0;

/// Tolerance for "edge is parallel to an axis" tests
pub const EDGE_AXIS_TOLERANCE: f64 = 0.001;

/// Tolerance for "edge lies on a reference plane/corner" tests
pub const EDGE_POSITION_TOLERANCE: f64 = 0.1;

/// Slack around the lower cavity height when picking inner corner edges
pub const INNER_CORNER_Z_SLACK: f64 = 0.5;

/// Extra extrusion depth of engraved text so the cut is clean
pub const ENGRAVE_EXTRA_DEPTH: f64 = 0.2;

/// How far below z = 0 the engraving solid starts
pub const ENGRAVE_Z_NUDGE: f64 = 0.1;

/// Gap between the two finished halves when laid out side by side
pub const DISPLAY_GAP: f64 = 10.0;

/// Default font used for engraving
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Name of the generated document
pub const DOCUMENT_NAME: &str = "Z13_Proto";

/// Object names in the generated document
pub const FRAME_OBJECT: &str = "Complete_Frame_U_Profile";
pub const LEFT_HALF_OBJECT: &str = "Left_Half";
pub const RIGHT_HALF_OBJECT: &str = "Right_Half";
pub const LEFT_FINAL_OBJECT: &str = "Left_Half_Final";
pub const RIGHT_FINAL_OBJECT: &str = "Right_Half_Final";
