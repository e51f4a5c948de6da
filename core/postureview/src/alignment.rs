//! Alignment view: the photo being positioned, drawn over a faded reference
//! photo with registration guides.

use std::fmt::{self, Display};

use glam::DVec2;

use crate::comparison::write_image;
use crate::overlay::num;
use crate::session::Photo;
use crate::transform::BoxSize;

pub const GHOST_OPACITY: f64 = 0.3;

/// Opacity of the target photo while it is being dragged.
pub const DRAGGING_OPACITY: f64 = 0.6;

/// Distance of the foot target's centre above the bottom edge, in pixels.
pub const FOOT_TARGET_INSET: f64 = 56.0;

pub const FOOT_TARGET_RADIUS: f64 = 16.0;

const GUIDE_COLOR: &str = "#ef4444";

/// One alignment frame. Each photo keeps its own transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentScene {
    pub target: Photo,
    pub ghost: Option<Photo>,
    pub dragging: bool,
}

impl AlignmentScene {
    pub fn new(target: Photo, ghost: Option<Photo>) -> Self {
        Self {
            target,
            ghost,
            dragging: false,
        }
    }

    pub fn dragging(mut self, dragging: bool) -> Self {
        self.dragging = dragging;
        self
    }

    pub fn target_opacity(&self) -> f64 {
        if self.dragging {
            DRAGGING_OPACITY
        } else {
            1.0
        }
    }

    /// Centre of the circle the user lines the feet up with.
    pub fn foot_target(size: BoxSize) -> DVec2 {
        DVec2::new(size.width / 2.0, size.height - FOOT_TARGET_INSET)
    }

    pub fn svg(&self, size: BoxSize) -> AlignmentSvg<'_> {
        AlignmentSvg { scene: self, size }
    }

    pub fn to_svg(&self, size: BoxSize) -> String {
        self.svg(size).to_string()
    }
}

/// [`Display`] adapter writing an alignment frame as a standalone SVG document.
pub struct AlignmentSvg<'a> {
    scene: &'a AlignmentScene,
    size: BoxSize,
}

impl Display for AlignmentSvg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scene = self.scene;
        let size = self.size;
        let (w, h) = (num(size.width), num(size.height));

        write!(f, r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}""#)?;
        writeln!(f, r#" viewBox="0 0 {w} {h}">"#)?;
        write!(f, r#"<defs><filter id="grayscale">"#)?;
        writeln!(f, r#"<feColorMatrix type="saturate" values="0"/></filter></defs>"#)?;
        writeln!(f, r##"<rect width="{w}" height="{h}" fill="#0f172a"/>"##)?;

        if let Some(ghost) = &scene.ghost {
            let extra = format!(
                r#" class="ghost" opacity="{}" filter="url(#grayscale)" {}"#,
                num(GHOST_OPACITY),
                r#"style="mix-blend-mode:screen""#
            );
            write_image(f, ghost, size, &extra)?;
        }
        let extra = format!(r#" class="target" opacity="{}""#, num(scene.target_opacity()));
        write_image(f, &scene.target, size, &extra)?;

        let (cx, cy) = (num(size.width / 2.0), num(size.height / 2.0));
        let foot = AlignmentScene::foot_target(size);
        writeln!(f, r#"<g class="guides" opacity="0.5" stroke="{GUIDE_COLOR}">"#)?;
        writeln!(f, r#"<line x1="0" y1="{cy}" x2="{w}" y2="{cy}" stroke-width="1"/>"#)?;
        writeln!(f, r#"<line x1="{cx}" y1="0" x2="{cx}" y2="{h}" stroke-width="1"/>"#)?;
        writeln!(
            f,
            r#"<circle cx="{}" cy="{}" r="{}" fill="none" stroke-width="2"/>"#,
            num(foot.x),
            num(foot.y),
            num(FOOT_TARGET_RADIUS)
        )?;
        writeln!(
            f,
            r#"<circle cx="{}" cy="{}" r="2" fill="{GUIDE_COLOR}" stroke="none"/>"#,
            num(foot.x),
            num(foot.y)
        )?;
        writeln!(f, "</g>")?;
        writeln!(f, "</svg>")
    }
}
