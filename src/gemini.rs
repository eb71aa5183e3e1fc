use async_trait::async_trait;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, error, debug};
use url::Url;

use crate::config::Settings;
use crate::error::GenerationError;
use crate::generative::{GenerationRequest, GenerativeModel};

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn preview(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[{} chars total]", &s[..end], s.len())
}

fn image_too_large(len: u64, max: usize) -> GenerationError {
    GenerationError::ImageFetch(format!("image is {} bytes, limit is {}", len, max))
}

fn append_capped(buf: &mut BytesMut, chunk: &[u8], max: usize) -> Result<(), GenerationError> {
    let total = buf.len() + chunk.len();
    if total > max {
        return Err(image_too_large(total as u64, max));
    }
    buf.extend_from_slice(chunk);
    Ok(())
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_image_bytes: usize,
}

/// Fetched image ready to be inlined into a request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, model: String, request_timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_image_bytes: 10 * 1024 * 1024,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GenerationError> {
        Ok(Self::new(
            settings.gemini_api_key.clone(),
            settings.gemini_api_base.clone(),
            settings.gemini_model.clone(),
            Duration::from_secs(settings.http_timeout_seconds),
        )?
        .with_max_image_bytes(settings.max_image_bytes))
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Download the image and encode it for `inlineData`.
    pub async fn fetch_image(&self, url: &Url) -> Result<InlineImage, GenerationError> {
        info!("🖼️ Fetching fabric image: {}", url);
        let mut response = self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| GenerationError::ImageFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::ImageFetch(format!("status={} url={}", status, url)));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

        if let Some(len) = response.content_length() {
            if len > self.max_image_bytes as u64 {
                return Err(image_too_large(len, self.max_image_bytes));
            }
        }

        // Content-Length may be absent or wrong, so the cap is enforced while reading
        let mut buf = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| GenerationError::ImageFetch(e.to_string()))? {
            append_capped(&mut buf, &chunk, self.max_image_bytes)?;
        }
        let bytes: Bytes = buf.freeze();
        if bytes.is_empty() {
            return Err(GenerationError::ImageFetch("empty body".into()));
        }

        let mime_type = match declared {
            Some(mime) if mime.starts_with("image/") => mime,
            _ => image::guess_format(&bytes)
                .map(|f| f.to_mime_type().to_string())
                .map_err(|_| GenerationError::ImageFetch(format!("{} is not an image", url)))?,
        };

        info!("📦 Fetched {} image ({} bytes)", mime_type, bytes.len());
        Ok(InlineImage {
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }

    fn build_request_body(request: &GenerationRequest, image: Option<&InlineImage>) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(image) = image {
            parts.push(json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.data }
            }));
        }
        json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
                "temperature": 0.4,
                "candidateCount": 1
            }
        })
    }

    async fn perform_api_call(&self, body: &Value) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let mut logged = body.clone();
        truncate_base64_in_json(&mut logged);
        debug!("📤 Request body: {}", serde_json::to_string_pretty(&logged).unwrap_or_default());

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            let message = serde_json::from_str::<ApiErrorEnvelope>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or(response_text);
            return Err(GenerationError::Api { status: status.as_u16(), message });
        }

        debug!("📥 Raw Gemini API response: {}", preview(&response_text, 1000));

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::Malformed(format!("parse error: {}", e)))?;

        extract_first_text(&parsed)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        info!("🎯 Running {} prompt on {}", request.task, self.model);

        let image = match &request.image_url {
            Some(url) => Some(self.fetch_image(url).await?),
            None => None,
        };
        let body = Self::build_request_body(request, image.as_ref());

        let text = self.perform_api_call(&body).await?;
        info!("✅ {} output received: {}", request.task, preview(&text, 200));

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| GenerationError::Malformed(format!("{}: {}", e, preview(&text, 200))))
    }
}

/// Models occasionally wrap JSON output in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde::de::IgnoredAny),
}

fn extract_first_text(resp: &GeminiResponse) -> Result<String, GenerationError> {
    if let Some(reason) = resp.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
        return Err(GenerationError::Blocked(reason));
    }
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Text { text } = p {
                if !text.trim().is_empty() {
                    return Ok(text.clone());
                }
            }
        }
        if let Some(reason) = c.finish_reason.as_deref() {
            if reason == "SAFETY" || reason == "PROHIBITED_CONTENT" {
                return Err(GenerationError::Blocked(reason.to_string()));
            }
        }
    }
    info!("⚠️ No text part found in response structure");
    Err(GenerationError::EmptyOutput)
}
