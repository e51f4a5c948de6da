//! Before/after posture comparison: photo preparation, per-photo view
//! transforms, landmark overlays, and the analysis call that produces them.
//!
//! # Example
//!
//! ```no_run
//! use postureview::{PhotoPreparer, Preset};
//!
//! let raw_bytes = std::fs::read("before.jpg").unwrap();
//! let photo = PhotoPreparer::new(raw_bytes)
//!     .unwrap()
//!     .preset(Preset::Standard)
//!     .prepare()
//!     .unwrap();
//! println!("{}x{}, {} bytes", photo.width, photo.height, photo.data.len());
//! let url = photo.to_data_url();
//! # let _ = url;
//! ```

mod compress;
mod error;

pub mod alignment;
pub mod analysis;
pub mod comparison;
pub mod config;
pub mod contract;
pub mod data_url;
pub mod gemini;
#[cfg(feature = "gemini")]
pub mod gemini_backend;
pub mod landmarks;
pub mod overlay;
pub mod retry;
pub mod session;
pub mod transform;

pub use alignment::AlignmentScene;
pub use analysis::{AnalysisBackend, AnalysisRequest, Analyzer, ViewImages};
pub use comparison::{Comparison, RevealClip, Scene, ViewSlot};
pub use config::{AnalyzerConfig, ApiKey};
pub use data_url::DataUrl;
pub use error::{AnalysisError, ComparisonError, ConfigError, ImageError, SessionError};
#[cfg(feature = "gemini")]
pub use gemini_backend::GeminiBackend;
pub use landmarks::{AnalysisResult, LandmarkSet, Point, ViewType};
pub use overlay::{LayerStyle, OverlayLayer};
pub use retry::{RetryPolicy, Sleeper};
pub use session::{Phase, Photo, Session, Stage};
pub use transform::{BoxSize, Offset, PhotoTransform, TransformPatch, TransformStore};

/// MIME type of every prepared photo.
pub const PREPARED_MIME: &str = "image/jpeg";

/// A photo ready for display and upload.
#[derive(Debug, Clone)]
pub struct PreparedPhoto {
    /// JPEG bytes.
    pub data: Vec<u8>,

    /// Width of the output image in pixels.
    pub width: u32,

    /// Height of the output image in pixels.
    pub height: u32,

    /// Size of the original input in bytes.
    pub original_size: usize,
}

impl PreparedPhoto {
    /// `data:image/jpeg;base64,...`, the form browsers display and the
    /// analyzer uploads.
    pub fn to_data_url(&self) -> String {
        DataUrl::new(PREPARED_MIME, self.data.clone()).to_url()
    }

    pub fn into_data_url(self) -> DataUrl {
        DataUrl::new(PREPARED_MIME, self.data)
    }
}

/// Pre-configured size/quality trade-offs.
///
/// Apply a preset with [`PhotoPreparer::preset`], then override individual
/// settings as needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// Small upload for quick analysis.
    ///
    /// - 512px longest edge
    /// - JPEG at 0.4 quality
    #[default]
    Compact,

    /// Balanced for on-screen comparison.
    ///
    /// - 1024px longest edge
    /// - JPEG at 0.7 quality
    Standard,

    /// Larger upload when fine landmark placement matters.
    ///
    /// - 1280px longest edge
    /// - JPEG at 0.9 quality
    Detailed,
}

impl Preset {
    fn settings(self) -> (u32, f32) {
        match self {
            Preset::Compact => (512, 0.4),
            Preset::Standard => (1024, 0.7),
            Preset::Detailed => (1280, 0.9),
        }
    }
}

/// Builder for preparing an uploaded photo.
///
/// Checks the input format on construction, then resizes, flattens
/// transparency onto white and re-encodes as JPEG.
pub struct PhotoPreparer {
    input: Vec<u8>,
    max_dimension: u32,
    quality: f32,
}

impl PhotoPreparer {
    /// Create a new preparer from raw image bytes (JPEG, PNG, or WebP).
    pub fn new(input: Vec<u8>) -> Result<Self, ImageError> {
        compress::detect_format(&input)?;

        let (max_dimension, quality) = Preset::default().settings();
        Ok(Self {
            input,
            max_dimension,
            quality,
        })
    }

    /// Create a preparer from a `data:` URL as read by a browser file input.
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        Self::new(DataUrl::parse(url)?.data)
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        (self.max_dimension, self.quality) = preset.settings();
        self
    }

    /// Cap for the longest edge in pixels (default: 512). Smaller images
    /// keep their size.
    pub fn max_dimension(mut self, dimension: u32) -> Self {
        self.max_dimension = dimension;
        self
    }

    /// JPEG quality from 0.0 (lowest) to 1.0 (highest). Default: 0.4.
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn prepare(self) -> Result<PreparedPhoto, ImageError> {
        if self.max_dimension == 0 {
            return Err(ImageError::InvalidMaxDimension);
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ImageError::InvalidQuality(self.quality));
        }

        compress::prepare_pipeline(&self.input, self.max_dimension, self.quality)
    }
}
