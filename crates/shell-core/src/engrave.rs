//! Mirrored text engraved into the outside of the bottom wall

use glam::DVec3;
use serde::{Deserialize, Serialize};
use shell_cad::{CadKernel, GlyphSource, Profile, SketchPlane, Solid};

use crate::constants::{ENGRAVE_EXTRA_DEPTH, ENGRAVE_Z_NUDGE};
use crate::error::ShellResult;
use crate::params::{Dimensions, TextParams};

/// How each character's outline became a face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphStats {
    /// Faces built from all contours with even-odd fill
    pub filled: usize,
    /// Faces built from the outer contour only
    pub outer_only: usize,
    pub skipped: usize,
}

/// The engraving cutter, already placed
#[derive(Debug, Clone)]
pub struct Engraving {
    pub solid: Solid,
    pub stats: GlyphStats,
}

/// Where the engraving's bounding box minimum ends up
pub fn target_corner(text: &TextParams, dims: &Dimensions) -> DVec3 {
    DVec3::new(
        text.x_offset,
        dims.outer_h - text.y_offset - text.size,
        -ENGRAVE_Z_NUDGE,
    )
}

/// Build the engraving solid for `text`, mirrored so it reads correctly from
/// below. Returns `None` when no character produced a face.
pub fn build_engraving(
    kernel: &dyn CadKernel,
    glyphs: &dyn GlyphSource,
    text: &TextParams,
    dims: &Dimensions,
) -> ShellResult<Option<Engraving>> {
    let contours = glyphs.glyph_contours(&text.text, text.size);
    if contours.is_empty() {
        tracing::warn!("No outlines for \"{}\", engraving skipped", text.text);
        return Ok(None);
    }

    let plane = SketchPlane::xy(0.0);
    let depth = text.depth + ENGRAVE_EXTRA_DEPTH;
    let mut stats = GlyphStats::default();
    let mut letters = Vec::with_capacity(contours.len());

    for (i, glyph) in contours.into_iter().enumerate() {
        let Some(first) = glyph.first().cloned() else {
            continue;
        };
        let filled = Profile::from_loops(glyph);
        match kernel.extrude(&filled, &plane, DVec3::Z, depth) {
            Ok(solid) => {
                stats.filled += 1;
                letters.push(solid);
                continue;
            }
            Err(e) => tracing::debug!("Character {} face failed ({}), using outer contour", i, e),
        }
        match kernel.extrude(&Profile::from_outer(first), &plane, DVec3::Z, depth) {
            Ok(solid) => {
                stats.outer_only += 1;
                letters.push(solid);
            }
            Err(e) => {
                tracing::warn!("Skipping character {}: {}", i, e);
                stats.skipped += 1;
            }
        }
    }

    let Some(fused) = kernel.fuse_all(&letters)? else {
        tracing::warn!("No faces for \"{}\", engraving skipped", text.text);
        return Ok(None);
    };

    let bbox = kernel.bounding_box(&fused)?;
    let mirrored = kernel.mirror(&fused, DVec3::new(bbox.center().x, 0.0, 0.0), DVec3::X)?;
    let bbox = kernel.bounding_box(&mirrored)?;
    let placed = kernel.translate(&mirrored, target_corner(text, dims) - bbox.min)?;

    tracing::info!(
        "Engraving \"{}\" from {} characters",
        text.text,
        stats.filled + stats.outer_only
    );

    Ok(Some(Engraving {
        solid: placed,
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ShellParams;
    use approx::assert_relative_eq;
    use glam::DVec2;
    use shell_cad::{CsgKernel, Wire2D};

    /// Glyph source that draws an "L" followed by a square ring
    struct FakeGlyphs;

    impl GlyphSource for FakeGlyphs {
        fn glyph_contours(&self, _text: &str, size: f64) -> Vec<Vec<Wire2D>> {
            let ell = Wire2D::polygon(vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(size * 0.6, 0.0),
                DVec2::new(size * 0.6, size * 0.2),
                DVec2::new(size * 0.2, size * 0.2),
                DVec2::new(size * 0.2, size),
                DVec2::new(0.0, size),
            ]);
            let ring = vec![
                Wire2D::rectangle(DVec2::new(size, size / 2.0), size * 0.6, size),
                Wire2D::rectangle(DVec2::new(size, size / 2.0), size * 0.3, size * 0.5),
            ];
            vec![vec![ell], ring]
        }
    }

    struct NoGlyphs;

    impl GlyphSource for NoGlyphs {
        fn glyph_contours(&self, _text: &str, _size: f64) -> Vec<Vec<Wire2D>> {
            Vec::new()
        }
    }

    /// One valid contour group followed by a group of degenerate loops
    struct BrokenGlyphs;

    impl GlyphSource for BrokenGlyphs {
        fn glyph_contours(&self, _text: &str, size: f64) -> Vec<Vec<Wire2D>> {
            let square = Wire2D::rectangle(DVec2::splat(size / 2.0), size, size);
            let sliver = Wire2D::polygon(vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(2.0, 2.0),
            ]);
            vec![vec![square.clone(), sliver.clone()], vec![sliver]]
        }
    }

    #[test]
    fn test_engraving_placement() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let engraving = build_engraving(&kernel, &FakeGlyphs, &params.text, &dims)
            .unwrap()
            .unwrap();
        assert_eq!(engraving.stats.filled, 2);

        let bbox = kernel.bounding_box(&engraving.solid).unwrap();
        assert_relative_eq!(bbox.min.x, 15.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.y, 181.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.z, -0.1, epsilon = 1e-9);
        // Engraving stays inside the bottom wall
        assert!(bbox.max.z < params.wall);
        assert_relative_eq!(bbox.max.z, 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_engraving_is_mirrored() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let solid = build_engraving(&kernel, &FakeGlyphs, &params.text, &dims)
            .unwrap()
            .unwrap()
            .solid;
        let bbox = kernel.bounding_box(&solid).unwrap();
        // Probe in unmirrored glyph coordinates
        let inside = |x: f64, y: f64| {
            kernel
                .contains_point(&solid, DVec3::new(bbox.max.x - x, bbox.min.y + y, 0.5))
                .unwrap()
        };

        // The "L" stem now sits at the right edge
        assert!(inside(1.0, 10.0));
        assert!(!inside(5.0, 10.0));
        // The ring's counter stays open
        assert!(inside(11.5, 7.5));
        assert!(!inside(15.0, 7.5));
    }

    #[test]
    fn test_outer_contour_fallback() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let engraving = build_engraving(&kernel, &BrokenGlyphs, &params.text, &dims)
            .unwrap()
            .unwrap();
        assert_eq!(
            engraving.stats,
            GlyphStats {
                filled: 0,
                outer_only: 1,
                skipped: 1,
            }
        );
    }

    #[test]
    fn test_no_outlines_gives_none() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let result = build_engraving(&kernel, &NoGlyphs, &params.text, &dims).unwrap();
        assert!(result.is_none());
    }
}
