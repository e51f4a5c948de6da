use std::fmt::Display;

use postureview::comparison::{normalize_slider, ViewSlot};
use postureview::landmarks::{AnalysisResult, LandmarkSet, PartialLandmarks, ViewType};
use postureview::overlay::render_svg;
use postureview::{
    gemini, AlignmentScene, AnalysisError, AnalysisRequest, ApiKey, BoxSize, Comparison,
    ComparisonError, ImageError, LayerStyle, Offset, Photo, PhotoPreparer, PhotoTransform, Preset,
    RetryPolicy, TransformPatch, ViewImages,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Options for photo preparation, passed as a JavaScript object.
///
/// All fields are optional. When a `preset` is specified, its defaults apply
/// and individual fields override them.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PrepareOptions {
    pub preset: Option<String>,
    pub max_dimension: Option<u32>,
    pub quality: Option<f32>,
}

fn string_to_preset(preset: &str) -> Result<Preset, JsValue> {
    match preset {
        "compact" => Ok(Preset::Compact),
        "standard" => Ok(Preset::Standard),
        "detailed" => Ok(Preset::Detailed),
        _ => Err(make_error("INVALID_OPTIONS", &format!("unknown preset: {preset}"))),
    }
}

fn string_to_style(layer: &str) -> Result<LayerStyle, JsValue> {
    match layer {
        "before" => Ok(LayerStyle::before()),
        "reference" => Ok(LayerStyle::reference()),
        "after" => Ok(LayerStyle::after()),
        _ => Err(make_error("INVALID_OPTIONS", &format!("unknown layer: {layer}"))),
    }
}

fn string_to_view_type(view: &str) -> Result<ViewType, JsValue> {
    view.parse().map_err(|e: String| make_error("INVALID_OPTIONS", &e))
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Machine-readable code carried on thrown JS errors.
trait ErrorCode: Display {
    fn code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for ImageError {
    fn code(&self) -> &'static str {
        match self {
            ImageError::DecodeError(_) => "DECODE_ERROR",
            ImageError::ZeroDimensions => "ZERO_DIMENSIONS",
            ImageError::EncodeError(_) => "ENCODE_ERROR",
            ImageError::InvalidQuality(_) => "INVALID_QUALITY",
            ImageError::InvalidMaxDimension => "INVALID_MAX_DIMENSION",
            ImageError::InvalidDataUrl(_) => "INVALID_DATA_URL",
        }
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> &'static str {
        match self {
            AnalysisError::MissingCredential => "MISSING_CREDENTIAL",
            AnalysisError::EmptyResponse => "EMPTY_RESPONSE",
            AnalysisError::InvalidResponseFormat(_) => "INVALID_RESPONSE_FORMAT",
            AnalysisError::RateLimited => "RATE_LIMITED",
            AnalysisError::TransientFailure(_) => "TRANSIENT_FAILURE",
            AnalysisError::Rejected { .. } => "REJECTED",
        }
    }

    fn retryable(&self) -> bool {
        self.is_retryable()
    }
}

impl ErrorCode for ComparisonError {
    fn code(&self) -> &'static str {
        match self {
            ComparisonError::MissingPhoto(_) => "MISSING_PHOTO",
        }
    }
}

/// Convert a library error into a JS `Error` with `code` and `retryable`
/// properties.
fn to_js_error<E: ErrorCode>(e: E) -> JsValue {
    let err = make_error(e.code(), &e.to_string());
    let _ = js_sys::Reflect::set(
        &err,
        &"retryable".into(),
        &JsValue::from_bool(e.retryable()),
    );
    err
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid {what}: {e}")))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| make_error("SERIALIZE_ERROR", &e.to_string()))
}

fn parse_options(options: JsValue) -> Result<PrepareOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(PrepareOptions::default())
    } else {
        from_js(options, "options")
    }
}

fn apply_options(
    mut preparer: PhotoPreparer,
    opts: &PrepareOptions,
) -> Result<PhotoPreparer, JsValue> {
    if let Some(ref p) = opts.preset {
        preparer = preparer.preset(string_to_preset(p)?);
    }
    if let Some(dim) = opts.max_dimension {
        preparer = preparer.max_dimension(dim);
    }
    if let Some(q) = opts.quality {
        preparer = preparer.quality(q);
    }
    Ok(preparer)
}

/// Shrink and re-encode an uploaded photo as JPEG.
///
/// @param input - Raw image bytes (JPEG, PNG, or WebP)
/// @param options - Optional object with fields: preset, maxDimension, quality
/// @returns `{ data, dataUrl, width, height, originalSize }`
#[wasm_bindgen(js_name = "prepareImage")]
pub fn prepare_image(input: Vec<u8>, options: JsValue) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;

    let preparer = PhotoPreparer::new(input).map_err(to_js_error)?;
    let photo = apply_options(preparer, &opts)?.prepare().map_err(to_js_error)?;

    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"data".into(), &js_sys::Uint8Array::from(&photo.data[..]))?;
    js_sys::Reflect::set(&obj, &"dataUrl".into(), &JsValue::from_str(&photo.to_data_url()))?;
    js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(photo.width))?;
    js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(photo.height))?;
    js_sys::Reflect::set(
        &obj,
        &"originalSize".into(),
        &JsValue::from(photo.original_size as u32),
    )?;
    Ok(JsValue::from(obj))
}

/// Pan/zoom/flip state of one displayed photo.
#[wasm_bindgen(js_name = "TransformStore")]
#[derive(Default)]
pub struct JsTransformStore {
    inner: postureview::TransformStore,
}

#[wasm_bindgen(js_class = "TransformStore")]
impl JsTransformStore {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ scale, offset: { x, y }, isFlipped }`
    pub fn current(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.current())
    }

    #[wasm_bindgen(js_name = "cssTransform")]
    pub fn css_transform(&self) -> String {
        self.inner.current().css_transform()
    }

    #[wasm_bindgen(js_name = "isDragging")]
    pub fn is_dragging(&self) -> bool {
        self.inner.is_dragging()
    }

    /// Merge a partial `{ scale?, offset?, isFlipped? }` into the transform.
    pub fn update(&mut self, patch: JsValue) -> Result<JsValue, JsValue> {
        let patch: TransformPatch = from_js(patch, "transform patch")?;
        to_js(&self.inner.update(patch))
    }

    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.reset())
    }

    #[wasm_bindgen(js_name = "beginDrag")]
    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.inner.begin_drag(Offset::new(x, y));
    }

    /// Returns the updated transform, or `null` outside a drag.
    #[wasm_bindgen(js_name = "dragTo")]
    pub fn drag_to(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        match self.inner.drag_to(Offset::new(x, y)) {
            Some(transform) => to_js(&transform),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = "endDrag")]
    pub fn end_drag(&mut self) {
        self.inner.end_drag();
    }

    #[wasm_bindgen(js_name = "zoomIn")]
    pub fn zoom_in(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.zoom_in())
    }

    #[wasm_bindgen(js_name = "zoomOut")]
    pub fn zoom_out(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.zoom_out())
    }

    #[wasm_bindgen(js_name = "toggleFlip")]
    pub fn toggle_flip(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.toggle_flip())
    }
}

fn parse_transform(transform: JsValue) -> Result<PhotoTransform, JsValue> {
    if transform.is_undefined() || transform.is_null() {
        Ok(PhotoTransform::default())
    } else {
        from_js(transform, "transform")
    }
}

/// SVG `<g>` for one landmark layer. Returns an empty string when the
/// landmarks are absent or incomplete.
///
/// @param landmarks - Landmark object in 0–1000 space, or null
/// @param transform - Photo transform of the photo underneath
/// @param layer - "before", "reference" or "after"
#[wasm_bindgen(js_name = "renderOverlay")]
pub fn render_overlay(
    landmarks: JsValue,
    transform: JsValue,
    layer: &str,
    width: f64,
    height: f64,
) -> Result<String, JsValue> {
    let partial: Option<PartialLandmarks> = from_js(landmarks, "landmarks")?;
    let set = partial.as_ref().and_then(LandmarkSet::from_partial);
    let transform = parse_transform(transform)?;
    let style = string_to_style(layer)?;
    Ok(render_svg(set.as_ref(), &transform, &style, BoxSize::new(width, height)))
}

#[derive(Deserialize)]
struct JsView {
    #[serde(rename = "type")]
    view_type: ViewType,
    before: String,
    after: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsRequest {
    view_a: JsView,
    #[serde(default)]
    view_b: Option<JsView>,
}

impl JsView {
    fn images(&self) -> Result<ViewImages, JsValue> {
        ViewImages::from_urls(self.view_type, &self.before, &self.after).map_err(to_js_error)
    }
}

/// Throws `MISSING_CREDENTIAL` when the key is absent or malformed.
#[wasm_bindgen(js_name = "checkApiKey")]
pub fn check_api_key(key: Option<String>) -> Result<(), JsValue> {
    let key = key.map(ApiKey::new);
    ApiKey::validate(key.as_ref()).map(|_| ()).map_err(to_js_error)
}

#[wasm_bindgen(js_name = "generateContentUrl")]
pub fn generate_content_url(endpoint: Option<String>, model: Option<String>) -> String {
    let defaults = postureview::AnalyzerConfig::default();
    gemini::generate_content_url(
        endpoint.as_deref().unwrap_or(&defaults.endpoint),
        model.as_deref().unwrap_or(&defaults.model),
    )
}

/// JSON body for one `generateContent` call.
///
/// @param request - `{ viewA: { type, before, after }, viewB? }` with
///   `data:` URL photos
#[wasm_bindgen(js_name = "buildRequestBody")]
pub fn build_request_body(request: JsValue) -> Result<String, JsValue> {
    let request: JsRequest = from_js(request, "request")?;
    let request = AnalysisRequest {
        view_a: request.view_a.images()?,
        view_b: request.view_b.as_ref().map(JsView::images).transpose()?,
    };
    Ok(gemini::request_body(&request).to_string())
}

/// Validate one HTTP response into an analysis result.
///
/// Throws with `code` set to one of the analysis error codes; `retryable`
/// tells the caller whether another attempt may succeed.
#[wasm_bindgen(js_name = "parseAnalysisResponse")]
pub fn parse_analysis_response(
    status: u16,
    body: &str,
    view_a: &str,
    view_b: Option<String>,
) -> Result<JsValue, JsValue> {
    let view_a = string_to_view_type(view_a)?;
    let view_b = view_b.as_deref().map(string_to_view_type).transpose()?;

    if !(200..300).contains(&status) {
        return Err(to_js_error(gemini::error_from_status(status, body)));
    }
    let text = gemini::extract_text(body).map_err(to_js_error)?;
    let result =
        postureview::contract::parse_response(&text, view_a, view_b).map_err(to_js_error)?;
    to_js(&result)
}

/// Milliseconds to wait before each retry of a transient failure.
#[wasm_bindgen(js_name = "retrySchedule")]
pub fn retry_schedule() -> Vec<u32> {
    RetryPolicy::default()
        .schedule()
        .iter()
        .map(|d| d.as_millis() as u32)
        .collect()
}

/// CSS `clip-path` for the after layer at a slider position. Out-of-range
/// values clamp and NaN means the default position, as in `renderComparison`.
#[wasm_bindgen(js_name = "revealClip")]
pub fn reveal_clip(slider: f64) -> String {
    postureview::RevealClip::from_slider(normalize_slider(slider)).css()
}

#[derive(Deserialize)]
struct JsPhotos {
    before: Option<Photo>,
    after: Option<Photo>,
}

/// Standalone SVG of a comparison frame.
///
/// @param result - Analysis result as returned by `parseAnalysisResponse`
/// @param photos - `{ before: { url, transform }, after: { url, transform } }`
/// @param view - "a" or "b"; falls back to "a" when the result has no second view
#[wasm_bindgen(js_name = "renderComparison")]
pub fn render_comparison(
    result: JsValue,
    photos: JsValue,
    view: &str,
    slider: f64,
    width: f64,
    height: f64,
) -> Result<String, JsValue> {
    let result: AnalysisResult = from_js(result, "analysis result")?;
    let photos: JsPhotos = from_js(photos, "photos")?;
    let slot: ViewSlot = serde_json::from_value(serde_json::Value::String(view.to_string()))
        .map_err(|_| make_error("INVALID_OPTIONS", &format!("unknown view: {view}")))?;

    let mut comparison = Comparison::new(result);
    comparison.select(slot);
    comparison.set_slider(slider);
    let scene = comparison
        .scene(photos.before.as_ref(), photos.after.as_ref())
        .map_err(to_js_error)?;
    Ok(scene.to_svg(BoxSize::new(width, height)))
}

#[derive(Deserialize)]
struct JsAlignmentPhotos {
    target: Photo,
    #[serde(default)]
    ghost: Option<Photo>,
}

/// Standalone SVG of the alignment view: the target photo over a grayscale
/// ghost of its counterpart, with centre and foot guides.
///
/// @param photos - `{ target: { url, transform }, ghost?: { url, transform } }`
/// @param dragging - Whether the target is mid-drag (drawn translucent)
#[wasm_bindgen(js_name = "renderAlignment")]
pub fn render_alignment(
    photos: JsValue,
    dragging: bool,
    width: f64,
    height: f64,
) -> Result<String, JsValue> {
    let photos: JsAlignmentPhotos = from_js(photos, "photos")?;
    let scene = AlignmentScene::new(photos.target, photos.ghost).dragging(dragging);
    Ok(scene.to_svg(BoxSize::new(width, height)))
}
