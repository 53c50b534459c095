use std::error::Error as StdError;
use std::fmt;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::{
    Conversation, ConversationSummary, CouncilResponse, ModelConfig, ModelsResponse,
    PresetsResponse, SavePresetRequest, SavePresetResponse, SendMessageRequest, SuccessResponse,
};
use crate::utils::url::{api_url, conversation_path, encode_path_segment};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Body of a streamed turn, one transport chunk per item.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Errors talking to the council backend.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or its response body not read.
    Request(reqwest::Error),
    /// The backend answered with a non-success status.
    Status { status: u16, summary: String },
    /// The response stream failed after it was opened.
    Transport(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request(source) => write!(f, "Request failed: {source}"),
            ApiError::Status { status, summary } => {
                write!(f, "Council API returned {status}: {summary}")
            }
            ApiError::Transport(reason) => write!(f, "Stream interrupted: {reason}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Request(source) => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(source: reqwest::Error) -> Self {
        ApiError::Request(source)
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    // FastAPI puts the reason in `detail`; proxies tend to use `error`.
    let summary = value
        .get("detail")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| value.get("error").and_then(|v| v.as_str()).map(str::to_owned))
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Condense an error body into one line for the status bar.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ApiError::Status {
        status: status.as_u16(),
        summary: summarize_error_body(&body),
    })
}

#[derive(Clone)]
pub struct CouncilClient {
    http: reqwest::Client,
    base_url: String,
}

impl CouncilClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = api_url(&self.base_url, path);
        debug!(method = %method, url = %url, "Council API request");
        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        self.get("api/conversations").await
    }

    pub async fn create_conversation(&self) -> Result<Conversation, ApiError> {
        self.request(Method::POST, "api/conversations", Some(&serde_json::json!({})))
            .await
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, ApiError> {
        self.get(&conversation_path(conversation_id, None)).await
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        self.request::<(), SuccessResponse>(
            Method::DELETE,
            &conversation_path(conversation_id, None),
            None,
        )
        .await
        .map(|_| ())
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        self.get::<ModelsResponse>("api/models")
            .await
            .map(|response| response.models)
    }

    pub async fn get_presets(&self) -> Result<PresetsResponse, ApiError> {
        self.get("api/presets").await
    }

    pub async fn save_preset(&self, preset: &SavePresetRequest) -> Result<String, ApiError> {
        self.request::<_, SavePresetResponse>(Method::POST, "api/presets", Some(preset))
            .await
            .map(|response| response.preset_id)
    }

    pub async fn delete_preset(&self, preset_id: &str) -> Result<(), ApiError> {
        let path = format!("api/presets/{}", encode_path_segment(preset_id));
        self.request::<(), SuccessResponse>(Method::DELETE, &path, None)
            .await
            .map(|_| ())
    }

    pub async fn get_conversation_models(
        &self,
        conversation_id: &str,
    ) -> Result<ModelConfig, ApiError> {
        self.get(&conversation_path(conversation_id, Some("models")))
            .await
    }

    pub async fn update_conversation_models(
        &self,
        conversation_id: &str,
        config: &ModelConfig,
    ) -> Result<(), ApiError> {
        self.request::<_, SuccessResponse>(
            Method::POST,
            &conversation_path(conversation_id, Some("models")),
            Some(config),
        )
        .await
        .map(|_| ())
    }

    /// Runs a whole council turn and returns only the aggregate result.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CouncilResponse, ApiError> {
        self.request(
            Method::POST,
            &conversation_path(conversation_id, Some("message")),
            Some(&SendMessageRequest { content }),
        )
        .await
    }

    /// Opens the streamed variant of a turn and hands back the raw body.
    pub async fn open_message_stream(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ByteStream, ApiError> {
        let url = api_url(
            &self.base_url,
            &conversation_path(conversation_id, Some("message/stream")),
        );
        debug!(url = %url, "Opening council event stream");
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&SendMessageRequest { content })
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| ApiError::Transport(err.to_string()))
            })
            .boxed())
    }
}
