//! Per-photo alignment state: scale, pixel offset, and horizontal flip.
//!
//! The same [`PhotoTransform`] drives the photo itself and every overlay drawn
//! on top of it, so landmarks stay glued to the image while it is dragged,
//! zoomed, or mirrored.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

use crate::overlay::num;

/// Smallest scale a photo can be zoomed out to.
pub const MIN_SCALE: f64 = 0.1;

/// Step applied by a single zoom-in or zoom-out action.
pub const SCALE_STEP: f64 = 0.1;

/// A 2D offset or pointer position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Size of the box a photo is displayed in, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Display transform of one photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoTransform {
    pub scale: f64,
    pub offset: Offset,
    pub is_flipped: bool,
}

impl Default for PhotoTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Offset::ZERO,
            is_flipped: false,
        }
    }
}

/// Partial update merged into a [`PhotoTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformPatch {
    pub scale: Option<f64>,
    pub offset: Option<Offset>,
    pub is_flipped: Option<bool>,
}

fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.max(MIN_SCALE)
    } else {
        MIN_SCALE
    }
}

impl PhotoTransform {
    /// Merge `patch` over `self`, returning the new transform.
    pub fn update(&self, patch: TransformPatch) -> PhotoTransform {
        PhotoTransform {
            scale: patch.scale.map(clamp_scale).unwrap_or(self.scale),
            offset: patch.offset.unwrap_or(self.offset),
            is_flipped: patch.is_flipped.unwrap_or(self.is_flipped),
        }
    }

    pub fn reset() -> PhotoTransform {
        PhotoTransform::default()
    }

    pub fn translated(&self, delta: Offset) -> PhotoTransform {
        self.update(TransformPatch {
            offset: Some(self.offset + delta),
            ..Default::default()
        })
    }

    pub fn zoomed_in(&self) -> PhotoTransform {
        self.update(TransformPatch {
            scale: Some(self.scale + SCALE_STEP),
            ..Default::default()
        })
    }

    pub fn zoomed_out(&self) -> PhotoTransform {
        self.update(TransformPatch {
            scale: Some((self.scale - SCALE_STEP).max(MIN_SCALE)),
            ..Default::default()
        })
    }

    pub fn flipped(&self) -> PhotoTransform {
        self.update(TransformPatch {
            is_flipped: Some(!self.is_flipped),
            ..Default::default()
        })
    }

    /// CSS `transform` value. Pair with `transform-origin: center center`.
    pub fn css_transform(&self) -> String {
        format!(
            "scale({}) translate({}px, {}px) scaleX({})",
            self.scale,
            self.offset.x,
            self.offset.y,
            if self.is_flipped { -1 } else { 1 }
        )
    }

    /// The CSS transform as an affine matrix about the center of `size`.
    ///
    /// The offset is applied inside the scale, so a drag of `d` pixels moves
    /// the photo by `scale * d` on screen, matching the CSS composition.
    pub fn to_affine(&self, size: BoxSize) -> DAffine2 {
        let center = size.center();
        let mirror = if self.is_flipped { -1.0 } else { 1.0 };
        DAffine2::from_translation(center)
            * DAffine2::from_scale(DVec2::splat(self.scale))
            * DAffine2::from_translation(DVec2::new(self.offset.x, self.offset.y))
            * DAffine2::from_scale(DVec2::new(mirror, 1.0))
            * DAffine2::from_translation(-center)
    }

    /// Map a point in the untransformed box into display space.
    pub fn map_point(&self, size: BoxSize, point: DVec2) -> DVec2 {
        self.to_affine(size).transform_point2(point)
    }

    /// SVG `matrix(a b c d e f)` equivalent of [`PhotoTransform::to_affine`].
    pub fn svg_matrix(&self, size: BoxSize) -> String {
        let m = self.to_affine(size);
        format!(
            "matrix({} {} {} {} {} {})",
            num(m.matrix2.x_axis.x),
            num(m.matrix2.x_axis.y),
            num(m.matrix2.y_axis.x),
            num(m.matrix2.y_axis.y),
            num(m.translation.x),
            num(m.translation.y)
        )
    }
}

/// Gesture-driven owner of one photo's transform.
///
/// Drag deltas are always taken against the immediately preceding pointer
/// sample, so dropped frames never accumulate drift.
#[derive(Debug, Clone, Default)]
pub struct TransformStore {
    current: PhotoTransform,
    last_pointer: Option<Offset>,
}

impl TransformStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(transform: PhotoTransform) -> Self {
        Self {
            current: transform,
            last_pointer: None,
        }
    }

    pub fn current(&self) -> PhotoTransform {
        self.current
    }

    pub fn is_dragging(&self) -> bool {
        self.last_pointer.is_some()
    }

    pub fn update(&mut self, patch: TransformPatch) -> PhotoTransform {
        self.current = self.current.update(patch);
        self.current
    }

    pub fn reset(&mut self) -> PhotoTransform {
        self.current = PhotoTransform::reset();
        self.last_pointer = None;
        self.current
    }

    pub fn begin_drag(&mut self, pointer: Offset) {
        self.last_pointer = Some(pointer);
    }

    /// Apply one pointer-move sample. Returns the new transform, or `None`
    /// when no drag is active.
    pub fn drag_to(&mut self, pointer: Offset) -> Option<PhotoTransform> {
        let last = self.last_pointer?;
        self.current = self.current.translated(pointer - last);
        self.last_pointer = Some(pointer);
        Some(self.current)
    }

    pub fn end_drag(&mut self) {
        self.last_pointer = None;
    }

    pub fn zoom_in(&mut self) -> PhotoTransform {
        self.current = self.current.zoomed_in();
        self.current
    }

    pub fn zoom_out(&mut self) -> PhotoTransform {
        self.current = self.current.zoomed_out();
        self.current
    }

    pub fn toggle_flip(&mut self) -> PhotoTransform {
        self.current = self.current.flipped();
        self.current
    }
}
