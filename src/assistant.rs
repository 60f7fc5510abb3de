//! AI question answering.
//!
//! The dispatcher only sees the [`Assistant`] trait. The Gemini backend
//! sends one `generateContent` request per question, with the active
//! document inlined; there is no retry.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    config::{AssistantConfig, AssistantProvider, gemini_api_key},
    error::{Error, Result},
    normalize,
};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const DOCUMENT_INSTRUCTION: &str = "You are a helpful assistant answering questions \
about the attached document. Be precise and answer in the language of the question.";

const GENERAL_INSTRUCTION: &str = "You are a helpful assistant of a document search \
service. Answer general questions accurately and in a friendly tone, in the language \
of the question.";

#[async_trait]
pub trait Assistant: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Answer `question`, about `document` when one is given.
    ///
    /// `Ok(None)` means the backend produced no usable answer.
    async fn ask(&self, document: Option<&Path>, question: &str) -> Result<Option<String>>;
}

/// Stand-in used when no AI backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAssistant;

#[async_trait]
impl Assistant for DisabledAssistant {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn ask(&self, _document: Option<&Path>, _question: &str) -> Result<Option<String>> {
        Err(Error::Assistant("AI assistant is disabled".into()))
    }
}

/// Google Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiAssistant {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiAssistant {
    pub fn new(config: &AssistantConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
        })
    }

    async fn request_body(&self, document: Option<&Path>, question: &str) -> Result<Value> {
        let (instruction, parts) = match document {
            Some(path) => {
                let bytes = tokio::fs::read(path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let parts = json!([
                    {
                        "inline_data": {
                            "mime_type": mime_type(path),
                            "data": STANDARD.encode(&bytes),
                        }
                    },
                    {
                        "text": format!(
                            "You were given the document ({name}). Answer the question \
                             based on its contents. Question: {question}"
                        )
                    }
                ]);
                (DOCUMENT_INSTRUCTION, parts)
            }
            None => (GENERAL_INSTRUCTION, json!([{ "text": question }])),
        };

        Ok(json!({
            "system_instruction": { "parts": [{ "text": instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
        }))
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    async fn ask(&self, document: Option<&Path>, question: &str) -> Result<Option<String>> {
        let body = self.request_body(document, question).await?;
        let url = format!("{GEMINI_ENDPOINT}/models/{}:generateContent", self.model);

        info!(model = %self.model, with_document = document.is_some(), "asking Gemini");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Assistant(format!(
                "Gemini API error {status}: {body_text}"
            )));
        }

        let json: Value = response.json().await?;
        let answer = extract_text(&json);
        debug!(answered = answer.is_some(), "Gemini responded");
        Ok(answer)
    }
}

/// Build the assistant selected by the configuration.
pub fn from_config(config: &AssistantConfig) -> Result<Arc<dyn Assistant>> {
    match config.provider {
        AssistantProvider::Disabled => Ok(Arc::new(DisabledAssistant)),
        AssistantProvider::Gemini => {
            let api_key = gemini_api_key().ok_or_else(|| {
                Error::Config("GEMINI_API_KEY environment variable not set".into())
            })?;
            Ok(Arc::new(GeminiAssistant::new(config, api_key)?))
        }
    }
}

/// Concatenated text parts of the first candidate, if non-blank.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    (!text.trim().is_empty()).then_some(text)
}

/// MIME type by extension. A trailing `_` (as in `cv.pdf_`) is ignored.
fn mime_type(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let (_, ext) = normalize::split_extension(&name);

    match ext.trim_start_matches('.').trim_end_matches('_') {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
