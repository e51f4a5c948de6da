//! Request and response shapes of the Gemini `generateContent` endpoint.
//!
//! Pure functions only; the HTTP transport lives in `gemini_backend` so that
//! browser hosts can reuse these with their own `fetch`.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::analysis::{AnalysisRequest, ViewImages};
use crate::contract::response_schema;
use crate::error::AnalysisError;

pub const SYSTEM_INSTRUCTION: &str = "You are a world-class physical therapist. \
Compare the Before and After photos and quantify the change in posture in detail. \
Give every landmark in a 0-1000 coordinate space relative to the photo. \
For spinePath extract exactly 5 points along the line of the back, from top to bottom. \
Score beforeScore and afterScore separately for every detailed item.";

pub fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!("{}/models/{}:generateContent", endpoint.trim_end_matches('/'), model)
}

fn inline_image(image: &crate::DataUrl) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.base64_payload(),
        }
    })
}

fn view_parts(ordinal: usize, view: &ViewImages) -> [Value; 3] {
    [
        json!({ "text": format!("View {ordinal}: {}", view.view_type) }),
        inline_image(&view.before),
        inline_image(&view.after),
    ]
}

/// The JSON body of one `generateContent` call.
pub fn request_body(request: &AnalysisRequest) -> Value {
    let parts: Vec<Value> = request
        .views()
        .enumerate()
        .flat_map(|(i, view)| view_parts(i + 1, view))
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text of the first candidate of a successful response.
pub fn extract_text(body: &str) -> Result<String, AnalysisError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidResponseFormat(format!("response envelope: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    Ok(text)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Classify a non-success HTTP response.
pub fn error_from_status(status: u16, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    AnalysisError::from_status(status, message)
}
