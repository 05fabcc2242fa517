//! Client for the hosted inference provider (Google Gemini). One action
//! descriptor in; either a stream of text fragments or one structured quiz
//! document out. Stream close is the only end-of-message signal.

pub mod prompt;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use sarah_types::api::{ActionRequest, ChatAction};
use sarah_types::models::QuizData;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("model returned an unreadable response: {0}")]
    Parse(String),
    #[error("Image data is missing for explainImage action.")]
    MissingImage,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

// -- Provider wire types --

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn response_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect()
}

fn upstream_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
}

fn build_content(request: &ActionRequest) -> Result<Content, GatewayError> {
    let text = prompt::final_prompt(request);
    let mut parts = Vec::new();

    if request.action == ChatAction::ExplainImage {
        let data = request
            .image_base64
            .clone()
            .ok_or(GatewayError::MissingImage)?;
        let mime_type = request
            .mime_type
            .clone()
            .ok_or(GatewayError::MissingImage)?;
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData { mime_type, data }),
        });
    }

    parts.push(Part {
        text: Some(text),
        inline_data: None,
    });
    Ok(Content { parts })
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, verb: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{verb}",
            self.config.base_url, self.config.model
        )
    }

    async fn post(
        &self,
        verb: &str,
        query: &[(&str, &str)],
        body: &GenerateRequest,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .client
            .post(self.endpoint(verb))
            .query(query)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let message = upstream_error_message(&text)
                .unwrap_or_else(|| format!("Request failed with status {status}"));
            return Err(GatewayError::Api { status, message });
        }
        Ok(resp)
    }

    /// Stream text fragments for a `solve` / `explainImage` action.
    ///
    /// The request is sent and its status checked before a stream is
    /// handed out; a mid-stream failure surfaces as an `Err` item and ends
    /// the stream.
    pub async fn stream_generate(
        &self,
        request: &ActionRequest,
    ) -> Result<BoxStream<'static, Result<String, GatewayError>>, GatewayError> {
        let body = GenerateRequest {
            contents: vec![build_content(request)?],
            generation_config: None,
        };
        let resp = self
            .post("streamGenerateContent", &[("alt", "sse")], &body)
            .await?;

        let mut bytes = resp.bytes_stream();
        Ok(Box::pin(async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GatewayError::Http(e));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    match serde_json::from_str::<GenerateResponse>(data) {
                        Ok(event) => {
                            let text = response_text(event);
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(GatewayError::Parse(e.to_string()));
                            return;
                        }
                    }
                }
            }
        }))
    }

    /// Non-streaming `generateQuiz` action: asks for a JSON document
    /// constrained by the quiz schema and parses it into [`QuizData`].
    pub async fn generate_quiz(&self, request: &ActionRequest) -> Result<QuizData, GatewayError> {
        let body = GenerateRequest {
            contents: vec![build_content(request)?],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: prompt::quiz_schema(),
            }),
        };

        let resp = self.post("generateContent", &[], &body).await?;
        let response: GenerateResponse = resp.json().await?;
        let text = response_text(response);

        serde_json::from_str(&text).map_err(|e| {
            warn!("Quiz payload failed to parse: {}", e);
            GatewayError::Parse(e.to_string())
        })
    }
}
