//! End-to-end shell generation
//!
//! Frame blank, fillet passes, bisection, per-half cutouts and the optional
//! engraving run in that order, each on the previous stage's output. The
//! result is a [`Document`] holding every intermediate and final shape, and
//! a [`GenerationReport`] describing what was applied.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use shell_cad::{BooleanType, CadKernel, FontFile, GlyphSource, Solid};

use crate::bisect::{bisect, cut_weld_groove};
use crate::constants::{
    DISPLAY_GAP, DOCUMENT_NAME, FRAME_OBJECT, LEFT_FINAL_OBJECT, LEFT_HALF_OBJECT,
    RIGHT_FINAL_OBJECT, RIGHT_HALF_OBJECT,
};
use crate::cutouts::{Side, side_cutouts, subtract_all, vent_holes};
use crate::document::Document;
use crate::engrave::{GlyphStats, build_engraving};
use crate::error::ShellResult;
use crate::fillet::{FilletRecord, apply_all};
use crate::frame::build_frame;
use crate::params::{Dimensions, ShellParams, TextParams};

/// Which shell to build
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Plain,
    Engraved(TextParams),
}

/// What happened to the engraving stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngravingStatus {
    NotRequested,
    Applied { text: String, glyphs: GlyphStats },
    Skipped { reason: String },
}

/// Summary of one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub document: String,
    pub dimensions: Dimensions,
    pub bottom_cutout: bool,
    pub fillets: Vec<FilletRecord>,
    pub weld_groove: bool,
    pub left_cutouts: usize,
    pub right_cutouts: usize,
    pub vents: usize,
    pub engraving: EngravingStatus,
}

/// Generated document and its report
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub document: Document,
    pub report: GenerationReport,
}

impl ShellOutput {
    /// Finished left half
    pub fn left(&self) -> Option<&Solid> {
        self.document.get(LEFT_FINAL_OBJECT).map(|o| &o.solid)
    }

    /// Finished right half
    pub fn right(&self) -> Option<&Solid> {
        self.document.get(RIGHT_FINAL_OBJECT).map(|o| &o.solid)
    }
}

/// Runs the generation pipeline against a kernel
pub struct ShellGenerator<'a> {
    kernel: &'a dyn CadKernel,
    params: ShellParams,
    glyphs: Option<&'a dyn GlyphSource>,
}

impl<'a> ShellGenerator<'a> {
    pub fn new(kernel: &'a dyn CadKernel, params: ShellParams) -> Self {
        Self {
            kernel,
            params,
            glyphs: None,
        }
    }

    /// Use `glyphs` for engraving instead of loading the configured font
    pub fn with_glyphs(mut self, glyphs: &'a dyn GlyphSource) -> Self {
        self.glyphs = Some(glyphs);
        self
    }

    pub fn params(&self) -> &ShellParams {
        &self.params
    }

    pub fn generate(&self, variant: Variant) -> ShellResult<ShellOutput> {
        let kernel = self.kernel;
        let params = &self.params;
        params.validate()?;
        let dims = Dimensions::from_params(params);

        tracing::info!(
            "Generating shell {} x {} x {} mm with {} kernel",
            dims.outer_w,
            dims.outer_h,
            dims.total_height,
            kernel.name()
        );

        let mut doc = Document::new(DOCUMENT_NAME);

        let blank = build_frame(kernel, params, &dims)?;
        let (frame, fillets) = apply_all(kernel, &blank.solid, params, &dims);
        doc.add(FRAME_OBJECT, frame.clone()).visible = false;

        let mut halves = bisect(kernel, &frame, &dims)?;
        if let Some(groove) = &params.weld_groove {
            halves = cut_weld_groove(kernel, halves, groove, &dims)?;
        }
        doc.add(LEFT_HALF_OBJECT, halves.left.clone()).visible = false;
        doc.add(RIGHT_HALF_OBJECT, halves.right.clone()).visible = false;

        let vents = vent_holes(kernel, params, &dims)?;
        let mut left_cuts = side_cutouts(kernel, params, &dims, Side::Left)?;
        let mut right_cuts = side_cutouts(kernel, params, &dims, Side::Right)?;
        let (left_count, right_count) = (left_cuts.len(), right_cuts.len());
        left_cuts.extend(vents.iter().cloned());
        right_cuts.extend(vents.iter().cloned());

        let mut left = subtract_all(kernel, &halves.left, &left_cuts)?;
        let right = subtract_all(kernel, &halves.right, &right_cuts)?;
        tracing::info!(
            "Cut {} left, {} right and {} vent openings",
            left_count,
            right_count,
            vents.len()
        );

        let engraving = match variant {
            Variant::Plain => EngravingStatus::NotRequested,
            Variant::Engraved(text) => {
                text.validate(params.wall)?;
                let (status, cutter) = self.engrave(&text, &dims)?;
                if let Some(cutter) = cutter {
                    left = kernel.boolean(&left, &cutter, BooleanType::Subtract)?;
                }
                status
            }
        };

        doc.add(LEFT_FINAL_OBJECT, left);
        doc.add(RIGHT_FINAL_OBJECT, right).placement =
            DVec3::new(dims.outer_w / 2.0 + DISPLAY_GAP, 0.0, 0.0);

        let report = GenerationReport {
            document: doc.name.clone(),
            dimensions: dims,
            bottom_cutout: blank.bottom_cutout_applied,
            fillets,
            weld_groove: params.weld_groove.is_some(),
            left_cutouts: left_count,
            right_cutouts: right_count,
            vents: vents.len(),
            engraving,
        };
        tracing::info!("Shell generation complete");

        Ok(ShellOutput {
            document: doc,
            report,
        })
    }

    fn engrave(
        &self,
        text: &TextParams,
        dims: &Dimensions,
    ) -> ShellResult<(EngravingStatus, Option<Solid>)> {
        let font;
        let glyphs: &dyn GlyphSource = match self.glyphs {
            Some(glyphs) => glyphs,
            None => match FontFile::load(&text.font) {
                Ok(loaded) => {
                    font = loaded;
                    &font
                }
                Err(e) => {
                    tracing::warn!("Engraving skipped: {}", e);
                    return Ok((
                        EngravingStatus::Skipped {
                            reason: e.to_string(),
                        },
                        None,
                    ));
                }
            },
        };

        Ok(match build_engraving(self.kernel, glyphs, text, dims)? {
            Some(engraving) => (
                EngravingStatus::Applied {
                    text: text.text.clone(),
                    glyphs: engraving.stats,
                },
                Some(engraving.solid),
            ),
            None => (
                EngravingStatus::Skipped {
                    reason: format!("no faces for \"{}\"", text.text),
                },
                None,
            ),
        })
    }
}
