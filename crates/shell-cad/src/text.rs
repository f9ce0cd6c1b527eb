//! Font outlines for engraved text
//!
//! Glyph outlines are flattened into closed polygons, one group of
//! contours per character, in a Y-up coordinate frame with the baseline on
//! the X axis.

use std::path::{Path, PathBuf};

use glam::DVec2;
use rusttype::{Font, OutlineBuilder, Scale, point};
use thiserror::Error;

use crate::kernel::Wire2D;

/// Line segments per quadratic curve
const QUAD_SEGMENTS: usize = 8;
/// Line segments per cubic curve
const CUBIC_SEGMENTS: usize = 12;

/// Error type for font loading and outlining
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font data in {0}")]
    InvalidFont(PathBuf),
}

/// Anything that can turn a string into per-character contour groups
pub trait GlyphSource {
    /// Contours of every character of `text` that has an outline, laid out
    /// at `size` millimeters per em
    fn glyph_contours(&self, text: &str, size: f64) -> Vec<Vec<Wire2D>>;
}

/// A TrueType/OpenType font loaded from disk
pub struct FontFile {
    path: PathBuf,
    font: Font<'static>,
}

impl FontFile {
    /// Load a font file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextError> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|source| TextError::Io {
            path: path.clone(),
            source,
        })?;
        let font = Font::try_from_vec(data).ok_or_else(|| TextError::InvalidFont(path.clone()))?;
        Ok(Self { path, font })
    }
}

impl std::fmt::Debug for FontFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFile").field("path", &self.path).finish()
    }
}

impl GlyphSource for FontFile {
    fn glyph_contours(&self, text: &str, size: f64) -> Vec<Vec<Wire2D>> {
        let scale = Scale::uniform(size as f32);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .filter_map(|glyph| {
                let mut builder = ContourBuilder::default();
                glyph.build_outline(&mut builder).then(|| builder.finish())
            })
            .filter(|contours| !contours.is_empty())
            .collect()
    }
}

/// Collects flattened contours from rusttype's outline callbacks
#[derive(Debug, Default)]
struct ContourBuilder {
    contours: Vec<Wire2D>,
    current: Vec<DVec2>,
}

impl ContourBuilder {
    fn last(&self) -> DVec2 {
        self.current.last().copied().unwrap_or(DVec2::ZERO)
    }

    fn push(&mut self, x: f32, y: f32) {
        // rusttype lays out with Y pointing down
        self.current.push(DVec2::new(f64::from(x), -f64::from(y)));
    }

    fn finish(mut self) -> Vec<Wire2D> {
        self.close();
        self.contours
    }
}

impl OutlineBuilder for ContourBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c = DVec2::new(f64::from(x1), -f64::from(y1));
        let p1 = DVec2::new(f64::from(x), -f64::from(y));
        for i in 1..=QUAD_SEGMENTS {
            let t = i as f64 / QUAD_SEGMENTS as f64;
            let mt = 1.0 - t;
            let q = p0 * (mt * mt) + c * (2.0 * mt * t) + p1 * (t * t);
            self.current.push(q);
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c1 = DVec2::new(f64::from(x1), -f64::from(y1));
        let c2 = DVec2::new(f64::from(x2), -f64::from(y2));
        let p1 = DVec2::new(f64::from(x), -f64::from(y));
        for i in 1..=CUBIC_SEGMENTS {
            let t = i as f64 / CUBIC_SEGMENTS as f64;
            let mt = 1.0 - t;
            let q = p0 * (mt * mt * mt)
                + c1 * (3.0 * mt * mt * t)
                + c2 * (3.0 * mt * t * t)
                + p1 * (t * t * t);
            self.current.push(q);
        }
    }

    fn close(&mut self) {
        let points = std::mem::take(&mut self.current);
        let wire = Wire2D::polygon(points);
        if wire.points.len() >= 3 {
            self.contours.push(wire);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contour_builder_flips_y_and_closes() {
        let mut b = ContourBuilder::default();
        b.move_to(0.0, 0.0);
        b.line_to(10.0, 0.0);
        b.line_to(10.0, -10.0);
        b.line_to(0.0, -10.0);
        b.line_to(0.0, 0.0);
        b.close();
        let contours = b.finish();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points.len(), 4);
        assert_relative_eq!(contours[0].points[2].y, 10.0);
        assert!(contours[0].closed);
    }

    #[test]
    fn test_quadratic_is_flattened() {
        let mut b = ContourBuilder::default();
        b.move_to(0.0, 0.0);
        b.quad_to(5.0, -10.0, 10.0, 0.0);
        b.close();
        let contours = b.finish();
        assert_eq!(contours[0].points.len(), QUAD_SEGMENTS + 1);
        // Curve midpoint lies halfway to the control point
        let mid = contours[0].points[QUAD_SEGMENTS / 2];
        assert_relative_eq!(mid.x, 5.0);
        assert_relative_eq!(mid.y, 5.0);
    }

    #[test]
    fn test_degenerate_contours_are_dropped() {
        let mut b = ContourBuilder::default();
        b.move_to(0.0, 0.0);
        b.line_to(1.0, 1.0);
        b.move_to(5.0, 5.0);
        let contours = b.finish();
        assert!(contours.is_empty());
    }

    #[test]
    fn test_missing_font_file() {
        let result = FontFile::load("/nonexistent/font.ttf");
        assert!(matches!(result, Err(TextError::Io { .. })));
    }

    #[test]
    fn test_invalid_font_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(FontFile::load(&path), Err(TextError::InvalidFont(_))));
    }

    #[test]
    fn test_system_font_outlines() {
        let path = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";
        if !Path::new(path).exists() {
            return;
        }
        let font = FontFile::load(path).unwrap();
        let glyphs = font.glyph_contours("A O", 15.0);
        // The space has no outline
        assert_eq!(glyphs.len(), 2);
        // "O" has an outer contour and a counter
        assert_eq!(glyphs[1].len(), 2);
        assert!(glyphs[0][0].points.iter().all(|p| p.y > -1.0));
    }
}
