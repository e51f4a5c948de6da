//! Before/after comparison of the active view behind a reveal slider.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::ComparisonError;
use crate::landmarks::{AnalysisResult, ViewAnalysis, ViewType};
use crate::overlay::{num, project_layer, LayerStyle, OverlayLayer};
use crate::session::Photo;
use crate::transform::BoxSize;

/// Slider position a new comparison starts at.
pub const DEFAULT_SLIDER: u8 = 50;

/// Slider position for a raw input value: rounded and clamped to 0–100, with
/// NaN falling back to [`DEFAULT_SLIDER`].
pub fn normalize_slider(value: f64) -> u8 {
    if value.is_nan() {
        DEFAULT_SLIDER
    } else {
        value.round().clamp(0.0, 100.0) as u8
    }
}

/// Which of the (up to) two views of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSlot {
    A,
    B,
}

/// Horizontal clip of the "after" layer, inset from the right edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealClip {
    pub right_inset_pct: f64,
}

impl RevealClip {
    pub fn from_slider(slider: u8) -> Self {
        Self {
            right_inset_pct: 100.0 - slider.min(100) as f64,
        }
    }

    /// Share of the after layer left visible, 0.0–1.0.
    pub fn revealed_fraction(&self) -> f64 {
        (100.0 - self.right_inset_pct) / 100.0
    }

    /// CSS `clip-path` value.
    pub fn css(&self) -> String {
        format!("inset(0 {}% 0 0)", num(self.right_inset_pct))
    }
}

/// Interactive state of one analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    result: AnalysisResult,
    selected: ViewSlot,
    slider: u8,
}

impl Comparison {
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            result,
            selected: ViewSlot::A,
            slider: DEFAULT_SLIDER,
        }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn has_second_view(&self) -> bool {
        self.result.view_b.is_some()
    }

    pub fn select(&mut self, slot: ViewSlot) -> ViewSlot {
        self.selected = slot;
        self.active_slot()
    }

    /// The selected slot, falling back to A when B has no data.
    pub fn active_slot(&self) -> ViewSlot {
        match self.selected {
            ViewSlot::B if self.result.view_b.is_none() => ViewSlot::A,
            slot => slot,
        }
    }

    pub fn active_view(&self) -> &ViewAnalysis {
        match (self.active_slot(), &self.result.view_b) {
            (ViewSlot::B, Some(view)) => view,
            _ => &self.result.view_a,
        }
    }

    pub fn view_type(&self, slot: ViewSlot) -> Option<ViewType> {
        match slot {
            ViewSlot::A => Some(self.result.view_a.view_type),
            ViewSlot::B => self.result.view_b.as_ref().map(|v| v.view_type),
        }
    }

    pub fn slider(&self) -> u8 {
        self.slider
    }

    /// Set the slider, clamped to 0–100.
    pub fn set_slider(&mut self, value: f64) -> u8 {
        self.slider = normalize_slider(value);
        self.slider
    }

    pub fn after_clip(&self) -> RevealClip {
        RevealClip::from_slider(self.slider)
    }

    /// Assemble the drawable scene of the active view.
    pub fn scene(
        &self,
        before: Option<&Photo>,
        after: Option<&Photo>,
    ) -> Result<Scene, ComparisonError> {
        let before = before.ok_or(ComparisonError::MissingPhoto("before"))?;
        let after = after.ok_or(ComparisonError::MissingPhoto("after"))?;
        if before.url.is_empty() {
            return Err(ComparisonError::MissingPhoto("before"));
        }
        if after.url.is_empty() {
            return Err(ComparisonError::MissingPhoto("after"));
        }
        let view = self.active_view();
        let before_set = Some(&view.before_landmarks);
        let after_set = Some(&view.after_landmarks);

        Ok(Scene {
            view_type: view.view_type,
            before_layer: project_layer(before_set, &before.transform, &LayerStyle::before()),
            reference_layer: project_layer(before_set, &after.transform, &LayerStyle::reference()),
            after_layer: project_layer(after_set, &after.transform, &LayerStyle::after()),
            before_photo: before.clone(),
            after_photo: after.clone(),
            clip: self.after_clip(),
        })
    }
}

/// Everything drawn for one comparison frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub view_type: ViewType,
    pub before_photo: Photo,
    pub after_photo: Photo,
    pub before_layer: Option<OverlayLayer>,
    pub reference_layer: Option<OverlayLayer>,
    pub after_layer: Option<OverlayLayer>,
    pub clip: RevealClip,
}

impl Scene {
    pub fn svg(&self, size: BoxSize) -> SceneSvg<'_> {
        SceneSvg { scene: self, size }
    }

    pub fn to_svg(&self, size: BoxSize) -> String {
        self.svg(size).to_string()
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Write a photo as an `<image>` filling the box under its own transform.
pub(crate) fn write_image(
    f: &mut fmt::Formatter<'_>,
    photo: &Photo,
    size: BoxSize,
    extra: &str,
) -> fmt::Result {
    write!(
        f,
        r#"<image href="{}" x="0" y="0" width="{}" height="{}""#,
        escape_attr(&photo.url),
        num(size.width),
        num(size.height)
    )?;
    writeln!(
        f,
        r#" preserveAspectRatio="xMidYMid meet" transform="{}"{extra}/>"#,
        photo.transform.svg_matrix(size)
    )
}

/// [`Display`] adapter writing a scene as a standalone SVG document.
pub struct SceneSvg<'a> {
    scene: &'a Scene,
    size: BoxSize,
}

impl Display for SceneSvg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scene = self.scene;
        let (w, h) = (num(self.size.width), num(self.size.height));
        let reveal_width = self.size.width * scene.clip.revealed_fraction();

        write!(f, r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}""#)?;
        writeln!(
            f,
            r#" viewBox="0 0 {w} {h}" data-view="{}">"#,
            scene.view_type
        )?;
        writeln!(f, "<defs>")?;
        writeln!(
            f,
            r#"<clipPath id="after-reveal"><rect x="0" y="0" width="{}" height="{h}"/></clipPath>"#,
            num(reveal_width)
        )?;
        writeln!(
            f,
            r#"<filter id="grayscale"><feColorMatrix type="saturate" values="0"/></filter>"#
        )?;
        writeln!(f, "</defs>")?;
        writeln!(f, r##"<rect width="{w}" height="{h}" fill="#020617"/>"##)?;

        writeln!(f, r#"<g class="before">"#)?;
        write_image(
            f,
            &scene.before_photo,
            self.size,
            r#" opacity="0.4" filter="url(#grayscale)""#,
        )?;
        if let Some(layer) = &scene.before_layer {
            write!(f, "{}", layer.svg(self.size))?;
        }
        writeln!(f, "</g>")?;

        writeln!(f, r#"<g class="after" clip-path="url(#after-reveal)">"#)?;
        write_image(f, &scene.after_photo, self.size, "")?;
        for layer in [&scene.reference_layer, &scene.after_layer].into_iter().flatten() {
            write!(f, "{}", layer.svg(self.size))?;
        }
        writeln!(f, "</g>")?;

        let x = num(reveal_width);
        write!(f, r#"<line class="slider" x1="{x}" y1="0" x2="{x}" y2="{h}""#)?;
        writeln!(
            f,
            r##" stroke="#ffffff" stroke-opacity="0.8" stroke-width="4"/>"##
        )?;
        writeln!(f, "</svg>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::parse_response;
    use crate::contract::tests::response_json;
    use crate::transform::PhotoTransform;

    fn result(with_view_b: bool) -> AnalysisResult {
        let view_b = with_view_b.then_some(ViewType::Side);
        parse_response(&response_json(with_view_b).to_string(), ViewType::Front, view_b).unwrap()
    }

    fn photo(url: &str) -> Photo {
        Photo {
            url: url.to_string(),
            transform: PhotoTransform::default(),
        }
    }

    #[test]
    fn slider_extremes() {
        assert_eq!(RevealClip::from_slider(0).revealed_fraction(), 0.0);
        assert_eq!(RevealClip::from_slider(0).css(), "inset(0 100% 0 0)");
        assert_eq!(RevealClip::from_slider(100).revealed_fraction(), 1.0);
        assert_eq!(RevealClip::from_slider(100).css(), "inset(0 0% 0 0)");
        assert_eq!(RevealClip::from_slider(35).right_inset_pct, 65.0);
    }

    #[test]
    fn slider_normalisation() {
        assert_eq!(normalize_slider(f64::NAN), DEFAULT_SLIDER);
        assert_eq!(normalize_slider(f64::INFINITY), 100);
        assert_eq!(normalize_slider(-0.4), 0);
        assert_eq!(normalize_slider(49.6), 50);
    }

    #[test]
    fn slider_is_clamped() {
        let mut comparison = Comparison::new(result(false));
        assert_eq!(comparison.slider(), DEFAULT_SLIDER);
        assert_eq!(comparison.set_slider(140.0), 100);
        assert_eq!(comparison.set_slider(-3.0), 0);
        assert_eq!(comparison.set_slider(42.4), 42);
        assert_eq!(comparison.after_clip().right_inset_pct, 58.0);
    }

    #[test]
    fn second_view_falls_back_when_absent() {
        let mut comparison = Comparison::new(result(false));
        assert_eq!(comparison.select(ViewSlot::B), ViewSlot::A);
        assert_eq!(comparison.active_view().view_type, ViewType::Front);
        assert_eq!(comparison.view_type(ViewSlot::B), None);
    }

    #[test]
    fn second_view_is_selectable_when_present() {
        let mut comparison = Comparison::new(result(true));
        assert!(comparison.has_second_view());
        assert_eq!(comparison.select(ViewSlot::B), ViewSlot::B);
        assert_eq!(comparison.active_view().view_type, ViewType::Side);
        comparison.select(ViewSlot::A);
        assert_eq!(comparison.active_view().view_type, ViewType::Front);
    }

    #[test]
    fn scene_requires_both_photos() {
        let comparison = Comparison::new(result(false));
        assert_eq!(
            comparison.scene(None, Some(&photo("data:image/jpeg;base64,AA"))),
            Err(ComparisonError::MissingPhoto("before"))
        );
        assert_eq!(
            comparison.scene(Some(&photo("data:image/jpeg;base64,AA")), Some(&photo(""))),
            Err(ComparisonError::MissingPhoto("after"))
        );
    }

    #[test]
    fn scene_has_three_layers() {
        let comparison = Comparison::new(result(false));
        let before = photo("data:image/jpeg;base64,AA");
        let after = photo("data:image/jpeg;base64,BB");
        let scene = comparison.scene(Some(&before), Some(&after)).unwrap();
        assert_eq!(scene.before_layer.as_ref().unwrap().style, LayerStyle::before());
        assert_eq!(scene.reference_layer.as_ref().unwrap().style, LayerStyle::reference());
        assert_eq!(scene.after_layer.as_ref().unwrap().style, LayerStyle::after());
        assert_eq!(scene.clip, RevealClip::from_slider(DEFAULT_SLIDER));
    }

    #[test]
    fn scene_svg_clips_after_layer() {
        let mut comparison = Comparison::new(result(false));
        comparison.set_slider(25.0);
        let (before, after) = (
            photo("data:image/jpeg;base64,AA"),
            photo("data:image/jpeg;base64,BB"),
        );
        let scene = comparison.scene(Some(&before), Some(&after)).unwrap();
        let svg = scene.to_svg(BoxSize::new(300.0, 400.0));
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"<rect x="0" y="0" width="75" height="400"/>"#));
        assert!(svg.contains(r#"<g class="after" clip-path="url(#after-reveal)">"#));
        assert_eq!(svg.matches(r#"class="landmark-layer""#).count(), 3);
        assert!(svg.contains(r#"x1="75" y1="0" x2="75" y2="400""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn image_urls_are_escaped() {
        assert_eq!(escape_attr(r#"a"b<c&d"#), "a&quot;b&lt;c&amp;d");
    }
}
