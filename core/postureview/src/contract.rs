//! Wire contract with the analysis collaborator.
//!
//! The response schema is a bundled JSON document sent with every request.
//! Responses are parsed into loosely typed wire shapes and then converted to
//! [`AnalysisResult`]; a required field that is absent or out of range is an
//! [`AnalysisError::InvalidResponseFormat`], never a default.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::AnalysisError;
use crate::landmarks::{
    AnalysisResult, DetailedScores, LandmarkSet, PartialLandmarks, ScoreItem, ScoreStatus,
    ViewAnalysis, ViewType,
};

/// JSON schema of the expected response, in the collaborator's schema dialect.
pub const RESPONSE_SCHEMA: &str = include_str!("../schema/analysis_response.json");

pub fn response_schema() -> &'static serde_json::Value {
    static SCHEMA: OnceLock<serde_json::Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        serde_json::from_str(RESPONSE_SCHEMA).expect("bundled response schema is valid JSON")
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    view_a: WireView,
    #[serde(default)]
    view_b: Option<WireView>,
    overall_before_score: f64,
    overall_after_score: f64,
    detailed_scores: WireDetailedScores,
    summary: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct WireView {
    before_landmarks: Option<PartialLandmarks>,
    after_landmarks: Option<PartialLandmarks>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireScoreItem {
    label: String,
    before_score: f64,
    after_score: f64,
    description: String,
    status: ScoreStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDetailedScores {
    straight_neck: WireScoreItem,
    rolled_shoulder: WireScoreItem,
    kyphosis: WireScoreItem,
    swayback: WireScoreItem,
    o_legs: WireScoreItem,
}

fn invalid(reason: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidResponseFormat(reason.into())
}

/// Scores arrive as JSON numbers; they must be finite and within 0..=100.
fn score(field: &str, value: f64) -> Result<u8, AnalysisError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid(format!("{field} must be within 0..=100, got {value}")));
    }
    Ok(value.round() as u8)
}

fn score_item(key: &str, wire: WireScoreItem) -> Result<ScoreItem, AnalysisError> {
    Ok(ScoreItem {
        before_score: score(&format!("{key}.beforeScore"), wire.before_score)?,
        after_score: score(&format!("{key}.afterScore"), wire.after_score)?,
        label: wire.label,
        description: wire.description,
        status: wire.status,
    })
}

fn detailed_scores(wire: WireDetailedScores) -> Result<DetailedScores, AnalysisError> {
    Ok(DetailedScores {
        straight_neck: score_item("straightNeck", wire.straight_neck)?,
        rolled_shoulder: score_item("rolledShoulder", wire.rolled_shoulder)?,
        kyphosis: score_item("kyphosis", wire.kyphosis)?,
        swayback: score_item("swayback", wire.swayback)?,
        o_legs: score_item("oLegs", wire.o_legs)?,
    })
}

fn landmark_set(field: &str, wire: Option<PartialLandmarks>) -> Result<LandmarkSet, String> {
    let partial = wire.ok_or_else(|| format!("{field} is missing"))?;
    LandmarkSet::try_from(partial).map_err(|e| format!("{field}: {e}"))
}

fn view(name: &str, view_type: ViewType, wire: WireView) -> Result<ViewAnalysis, String> {
    Ok(ViewAnalysis {
        view_type,
        before_landmarks: landmark_set(&format!("{name}.beforeLandmarks"), wire.before_landmarks)?,
        after_landmarks: landmark_set(&format!("{name}.afterLandmarks"), wire.after_landmarks)?,
    })
}

/// Parse and validate a response text.
///
/// `view_a` and `view_b` are the view types of the request. An incomplete
/// view A is an error; an incomplete or missing view B downgrades the result
/// to a single view.
pub fn parse_response(
    text: &str,
    view_a: ViewType,
    view_b: Option<ViewType>,
) -> Result<AnalysisResult, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let wire: WireResponse = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;

    let view_a = view("viewA", view_a, wire.view_a).map_err(invalid)?;

    let view_b = match (view_b, wire.view_b) {
        (Some(view_type), Some(raw)) => match view("viewB", view_type, raw) {
            Ok(v) => Some(v),
            Err(reason) => {
                log::warn!("dropping second view, showing single view: {reason}");
                None
            }
        },
        (Some(_), None) => {
            log::warn!("response has no viewB, showing single view");
            None
        }
        (None, Some(_)) => {
            log::debug!("ignoring viewB that was not requested");
            None
        }
        (None, None) => None,
    };

    Ok(AnalysisResult {
        view_a,
        view_b,
        overall_before_score: score("overallBeforeScore", wire.overall_before_score)?,
        overall_after_score: score("overallAfterScore", wire.overall_after_score)?,
        detailed_scores: detailed_scores(wire.detailed_scores)?,
        summary: wire.summary,
    })
}
