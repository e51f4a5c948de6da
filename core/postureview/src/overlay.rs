//! Skeletal landmark overlay.
//!
//! Landmarks live in a 0–1000 space relative to the photo. They are mapped
//! to percentages of the photo box, drawn in box pixels, and wrapped in the
//! photo's own transform so they move with the image.

use std::fmt::{self, Display, Write as _};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::landmarks::{Landmark, LandmarkSet, Point, LANDMARK_SPACE, SPINE_POINTS};
use crate::transform::{BoxSize, PhotoTransform};

/// Map a landmark point to percentage coordinates of the photo box.
pub fn to_percent(point: Point) -> DVec2 {
    let per_percent = LANDMARK_SPACE / 100.0;
    DVec2::new(point.x / per_percent, point.y / per_percent)
}

/// Compact number formatting for SVG attributes.
pub(crate) fn num(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Look of one landmark layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub color: String,
    pub opacity: f64,
    /// Faded reference pass: dashed spine, thinner strokes, smaller markers.
    pub dashed: bool,
}

impl LayerStyle {
    /// "Before" landmarks over the before photo.
    pub fn before() -> Self {
        Self {
            color: "#94a3b8".to_string(),
            opacity: 1.0,
            dashed: false,
        }
    }

    /// "Before" landmarks ghosted over the after photo.
    pub fn reference() -> Self {
        Self {
            color: "#ffffff".to_string(),
            opacity: 0.3,
            dashed: true,
        }
    }

    /// "After" landmarks over the after photo.
    pub fn after() -> Self {
        Self {
            color: "#3b82f6".to_string(),
            opacity: 1.0,
            dashed: false,
        }
    }

    fn reference_dash(&self) -> (f64, f64) {
        if self.dashed {
            (0.5, 0.5)
        } else {
            (1.0, 1.0)
        }
    }

    fn spine_width(&self) -> f64 {
        if self.dashed {
            0.4
        } else {
            0.8
        }
    }

    /// Marker radius in CSS pixels.
    fn marker_radius(&self) -> f64 {
        if self.dashed {
            2.0
        } else {
            3.0
        }
    }

    fn marker_opacity(&self) -> f64 {
        if self.dashed {
            0.5
        } else {
            1.0
        }
    }
}

/// A joint marker in percentage coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub landmark: Landmark,
    pub at: DVec2,
}

/// One landmark set projected into percentage space, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    /// Head to heel.
    pub reference_line: (DVec2, DVec2),
    pub spine: [DVec2; SPINE_POINTS],
    pub markers: Vec<Marker>,
    pub transform: PhotoTransform,
    pub style: LayerStyle,
}

/// Project a landmark set for drawing. An absent set draws nothing.
pub fn project_layer(
    landmarks: Option<&LandmarkSet>,
    transform: &PhotoTransform,
    style: &LayerStyle,
) -> Option<OverlayLayer> {
    let set = landmarks?;
    Some(OverlayLayer {
        reference_line: (to_percent(set.head), to_percent(set.heel)),
        spine: set.spine_path.map(to_percent),
        markers: set
            .named_points()
            .map(|(landmark, point)| Marker {
                landmark,
                at: to_percent(point),
            })
            .collect(),
        transform: *transform,
        style: style.clone(),
    })
}

/// SVG for a possibly absent landmark set; empty when absent.
pub fn render_svg(
    landmarks: Option<&LandmarkSet>,
    transform: &PhotoTransform,
    style: &LayerStyle,
    size: BoxSize,
) -> String {
    project_layer(landmarks, transform, style)
        .map(|layer| layer.to_svg(size))
        .unwrap_or_default()
}

fn to_box(pct: DVec2, size: BoxSize) -> DVec2 {
    DVec2::new(pct.x / 100.0 * size.width, pct.y / 100.0 * size.height)
}

impl OverlayLayer {
    /// Spine as SVG path data in percentage units.
    pub fn spine_path_data(&self) -> String {
        let mut d = String::new();
        for (i, p) in self.spine.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(d, "{cmd} {} {}", num(p.x), num(p.y));
        }
        d
    }

    /// Marker centers in display pixels, after the photo transform.
    pub fn marker_positions(&self, size: BoxSize) -> Vec<(Landmark, DVec2)> {
        let affine = self.transform.to_affine(size);
        self.markers
            .iter()
            .map(|m| (m.landmark, affine.transform_point2(to_box(m.at, size))))
            .collect()
    }

    pub fn svg(&self, size: BoxSize) -> LayerSvg<'_> {
        LayerSvg { layer: self, size }
    }

    pub fn to_svg(&self, size: BoxSize) -> String {
        self.svg(size).to_string()
    }
}

/// [`Display`] adapter writing a layer as an SVG `<g>` element.
pub struct LayerSvg<'a> {
    layer: &'a OverlayLayer,
    size: BoxSize,
}

impl Display for LayerSvg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = self.layer;
        let style = &layer.style;
        let size = self.size;
        // stroke widths are specified in percent of the shorter box edge
        let unit = size.width.min(size.height) / 100.0;

        writeln!(
            f,
            r#"<g class="landmark-layer" transform="{}" opacity="{}">"#,
            layer.transform.svg_matrix(size),
            num(style.opacity)
        )?;

        let head = to_box(layer.reference_line.0, size);
        let heel = to_box(layer.reference_line.1, size);
        let (dash, gap) = style.reference_dash();
        write!(
            f,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}""#,
            num(head.x),
            num(head.y),
            num(heel.x),
            num(heel.y),
            style.color,
            num(0.2 * unit)
        )?;
        writeln!(
            f,
            r#" stroke-dasharray="{},{}" stroke-opacity="0.4"/>"#,
            num(dash * unit),
            num(gap * unit)
        )?;

        write!(f, r#"<path d=""#)?;
        for (i, p) in layer.spine.iter().enumerate() {
            let p = to_box(*p, size);
            let cmd = if i == 0 { "M" } else { " L" };
            write!(f, "{cmd} {} {}", num(p.x), num(p.y))?;
        }
        write!(
            f,
            r#"" fill="none" stroke="{}" stroke-width="{}""#,
            style.color,
            num(style.spine_width() * unit)
        )?;
        if style.dashed {
            write!(f, r#" stroke-dasharray="{},{}""#, num(unit), num(unit))?;
        }
        writeln!(f, r#" stroke-linecap="round" stroke-linejoin="round"/>"#)?;

        for marker in &layer.markers {
            let c = to_box(marker.at, size);
            write!(
                f,
                r#"<circle data-landmark="{}" cx="{}" cy="{}" r="{}""#,
                marker.landmark,
                num(c.x),
                num(c.y),
                num(style.marker_radius())
            )?;
            writeln!(
                f,
                r##" fill="{}" fill-opacity="{}" stroke="#ffffff" stroke-width="1"/>"##,
                style.color,
                num(style.marker_opacity())
            )?;
        }

        writeln!(f, "</g>")
    }
}
