use std::cell::Cell;
use std::rc::Rc;

use image::{ImageBuffer, Rgb, Rgba};
use postureview::overlay::{render_svg, to_percent};
use postureview::{
    AnalysisBackend, AnalysisError, AnalysisRequest, Analyzer, AnalyzerConfig, ApiKey, BoxSize,
    LayerStyle, Offset, Phase, PhotoPreparer, PhotoTransform, Point, Preset, Session, SessionError,
    Sleeper, Stage, TransformPatch, ViewSlot, ViewType,
};
use serde_json::{json, Value};

fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn landmarks(x: f64, y: f64) -> Value {
    let p = json!({"x": x, "y": y});
    json!({
        "head": {"x": x, "y": 100.0}, "ear": p, "shoulder": p,
        "spinePath": [p, p, p, p, p],
        "hip": p, "knee": p, "ankle": p, "heel": {"x": x, "y": 950.0}
    })
}

fn score(label: &str) -> Value {
    json!({
        "label": label,
        "beforeScore": 40,
        "afterScore": 80,
        "description": "noticeably better",
        "status": "improved"
    })
}

fn response(view_b: Option<Value>) -> String {
    let mut body = json!({
        "viewA": {
            "beforeLandmarks": landmarks(450.0, 500.0),
            "afterLandmarks": landmarks(500.0, 500.0)
        },
        "overallBeforeScore": 52,
        "overallAfterScore": 81,
        "detailedScores": {
            "straightNeck": score("Straight neck"),
            "rolledShoulder": score("Rolled shoulder"),
            "kyphosis": score("Kyphosis"),
            "swayback": score("Swayback"),
            "oLegs": score("O-legs")
        },
        "summary": "Head and shoulders sit noticeably further back."
    });
    if let Some(view_b) = view_b {
        body["viewB"] = view_b;
    }
    body.to_string()
}

struct CountingBackend {
    text: String,
    failures_before_success: u32,
    calls: Rc<Cell<u32>>,
}

impl AnalysisBackend for CountingBackend {
    fn generate(
        &self,
        _request: &AnalysisRequest,
        _api_key: &ApiKey,
    ) -> Result<String, AnalysisError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call < self.failures_before_success {
            Err(AnalysisError::TransientFailure("503 Service Unavailable".into()))
        } else {
            Ok(self.text.clone())
        }
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: std::time::Duration) {}
}

fn analyzer(text: String, failures_before_success: u32) -> (Analyzer, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let backend = CountingBackend {
        text,
        failures_before_success,
        calls: calls.clone(),
    };
    let analyzer = Analyzer::new(AnalyzerConfig::with_api_key("AIzaSyExample"), Box::new(backend))
        .sleeper(Box::new(NoSleep));
    (analyzer, calls)
}

fn prepared_url(width: u32, height: u32) -> String {
    PhotoPreparer::new(make_test_png(width, height))
        .unwrap()
        .prepare()
        .unwrap()
        .to_data_url()
}

#[test]
fn prepare_large_png_with_default_preset() {
    let input = make_test_png(2000, 1500);
    let photo = PhotoPreparer::new(input.clone()).unwrap().prepare().unwrap();

    assert_eq!((photo.width, photo.height), (512, 384));
    assert_eq!(photo.original_size, input.len());
    assert!(photo.data.len() < input.len());
    assert_eq!(&photo.data[..2], &[0xFF, 0xD8]);
}

#[test]
fn presets_scale_output() {
    let input = make_test_png(1600, 1600);
    let sizes: Vec<u32> = [Preset::Compact, Preset::Standard, Preset::Detailed]
        .into_iter()
        .map(|preset| {
            PhotoPreparer::new(input.clone())
                .unwrap()
                .preset(preset)
                .prepare()
                .unwrap()
                .width
        })
        .collect();
    assert_eq!(sizes, vec![512, 1024, 1280]);
}

#[test]
fn transparent_png_is_flattened() {
    let img = ImageBuffer::from_pixel(8, 8, Rgba([0u8, 0, 0, 0]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();

    let photo = PhotoPreparer::new(buf.into_inner()).unwrap().prepare().unwrap();
    let decoded = image::load_from_memory(&photo.data).unwrap().to_rgb8();
    let px = decoded.get_pixel(4, 4);
    assert!(px.0.iter().all(|&c| c > 240), "expected white, got {px:?}");
}

#[test]
fn full_session_from_upload_to_scene() {
    let mut session = Session::new();
    session.set_photo(ViewSlot::A, Phase::Before, prepared_url(300, 400));
    session.set_photo(ViewSlot::A, Phase::After, prepared_url(300, 400));

    let (analyzer, calls) = analyzer(response(None), 2);
    let stage = session.analyze(&analyzer).unwrap();
    assert!(matches!(stage, Stage::Results(_)));
    assert_eq!(calls.get(), 3);

    let comparison = session.comparison_mut().unwrap();
    assert_eq!(comparison.result().improvement(), 29);
    comparison.set_slider(0.0);

    let scene = session.scene().unwrap();
    assert_eq!(scene.clip.revealed_fraction(), 0.0);
    let svg = scene.to_svg(BoxSize::new(300.0, 400.0));
    assert!(svg.contains(r#"<rect x="0" y="0" width="0" height="400"/>"#));
    assert!(svg.contains("data:image/jpeg;base64,"));
}

#[test]
fn rate_limit_ends_session_in_failure() {
    struct Limited;
    impl AnalysisBackend for Limited {
        fn generate(&self, _: &AnalysisRequest, _: &ApiKey) -> Result<String, AnalysisError> {
            Err(AnalysisError::RateLimited)
        }
    }

    let mut session = Session::new();
    session.set_photo(ViewSlot::A, Phase::Before, prepared_url(40, 40));
    session.set_photo(ViewSlot::A, Phase::After, prepared_url(40, 40));

    let analyzer = Analyzer::new(AnalyzerConfig::with_api_key("AIzaSyExample"), Box::new(Limited));
    let stage = session.analyze(&analyzer).unwrap();
    assert_eq!(stage, &Stage::Failed(AnalysisError::RateLimited));
    assert_eq!(session.scene().unwrap_err(), SessionError::NoResult);
    assert_eq!(session.analyze(&analyzer), Err(SessionError::AnalysisFinished));
}

#[test]
fn alignment_drag_leaves_ghost_in_place() {
    let mut session = Session::new();
    session.set_photo(ViewSlot::A, Phase::Before, prepared_url(300, 400));
    session.set_photo(ViewSlot::A, Phase::After, prepared_url(300, 400));

    let store = session.transform_mut(ViewSlot::A, Phase::After).unwrap();
    store.begin_drag(Offset::new(100.0, 100.0));
    store.drag_to(Offset::new(120.0, 90.0));
    store.end_drag();

    let scene = session.alignment_scene(ViewSlot::A, Phase::After).unwrap();
    let svg = scene.to_svg(BoxSize::new(300.0, 400.0));
    assert!(svg.contains(r#"transform="matrix(1 0 0 1 0 0)" class="ghost""#));
    assert!(svg.contains(r#"transform="matrix(1 0 0 1 20 -10)" class="target" opacity="1""#));
}

#[test]
fn incomplete_second_view_downgrades_to_single_view() {
    let mut session = Session::new();
    for slot in [ViewSlot::A, ViewSlot::B] {
        session.set_photo(slot, Phase::Before, prepared_url(40, 40));
        session.set_photo(slot, Phase::After, prepared_url(40, 40));
    }

    let partial_b = json!({"beforeLandmarks": landmarks(500.0, 500.0)});
    let (analyzer, _) = analyzer(response(Some(partial_b)), 0);
    session.analyze(&analyzer).unwrap();

    let comparison = session.comparison_mut().unwrap();
    assert!(!comparison.has_second_view());
    assert_eq!(comparison.select(ViewSlot::B), ViewSlot::A);
}

#[test]
fn credential_is_checked_before_any_attempt() {
    let calls = Rc::new(Cell::new(0));
    let backend = CountingBackend {
        text: response(None),
        failures_before_success: 0,
        calls: calls.clone(),
    };
    let analyzer = Analyzer::new(AnalyzerConfig::with_api_key("abc"), Box::new(backend));

    let request = AnalysisRequest {
        view_a: postureview::ViewImages::from_urls(
            ViewType::Side,
            &prepared_url(8, 8),
            &prepared_url(8, 8),
        )
        .unwrap(),
        view_b: None,
    };
    assert_eq!(analyzer.analyze_request(&request), Err(AnalysisError::MissingCredential));
    assert_eq!(calls.get(), 0);
}

#[test]
fn overlay_follows_photo_transform() {
    let transform = PhotoTransform::default().update(TransformPatch {
        scale: Some(2.0),
        offset: Some(Offset::new(10.0, 0.0)),
        ..Default::default()
    });
    let size = BoxSize::new(200.0, 200.0);

    let centre = to_percent(Point::new(500.0, 500.0));
    assert_eq!((centre.x, centre.y), (50.0, 50.0));
    let mapped = transform.map_point(size, glam::DVec2::new(100.0, 100.0));
    assert_eq!((mapped.x, mapped.y), (120.0, 100.0));

    let svg = render_svg(None, &transform, &LayerStyle::after(), size);
    assert!(svg.is_empty());
}
