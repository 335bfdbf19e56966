use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::metrics::{CHAT_LATENCY, UPSTREAM_ERRORS};
use crate::models::{
    ChatRequest, CompletionMessage, CompletionRequest, CompletionResponse, ContentPart, ImageUrl,
    MessageContent,
};

pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

// Client for an OpenAI compatible chat completions API
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    vision_model: String,
    file_base_url: Option<Url>, // where relative attachment urls live
}

impl LlmClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: String,
        model: String,
        vision_model: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            vision_model,
            file_base_url: None,
        }
    }

    pub fn with_file_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| GatewayError::Config(format!("invalid file base url {}: {}", base, e)))?;
        self.file_base_url = Some(url);
        Ok(self)
    }

    /// `image` is the inline data URI of an attached image, if any.
    pub fn build_completion(&self, req: &ChatRequest, image: Option<&str>) -> CompletionRequest {
        let model = if image.is_some() {
            &self.vision_model
        } else {
            &self.model
        };

        CompletionRequest {
            model: model.clone(),
            messages: build_messages(req, image),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub async fn complete(&self, req: &ChatRequest) -> Result<String> {
        let image = self.inline_image(req).await?;
        let body = self.build_completion(req, image.as_deref());
        let start_time = Instant::now();
        debug!(model = %body.model, chat_type = ?req.chat_type, "Calling language model");

        let result = self.send(&body).await;
        CHAT_LATENCY.observe(start_time.elapsed().as_secs_f64());

        let completion = result.inspect_err(|e| {
            UPSTREAM_ERRORS.inc();
            warn!(error = %e, "Language model call failed");
        })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }

    async fn send(&self, body: &CompletionRequest) -> Result<CompletionResponse> {
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "language model returned {}",
                status
            )));
        }

        Ok(res.json::<CompletionResponse>().await?)
    }

    // Download an attached image and turn it into a data: URI the model can read
    async fn inline_image(&self, req: &ChatRequest) -> Result<Option<String>> {
        if !req.has_image() {
            return Ok(None);
        }
        let Some(url) = req.file_url.as_deref() else {
            return Ok(None);
        };
        if url.starts_with("data:") {
            return Ok(Some(url.to_string()));
        }

        let target = self.attachment_url(url)?;
        debug!(url = %target, "Fetching image attachment");

        let res = self.client.get(target).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "attachment fetch returned {}",
                status
            )));
        }

        let bytes = res.bytes().await?;
        let mime = req.file_type.as_deref().unwrap_or("application/octet-stream");
        Ok(Some(format!("data:{};base64,{}", mime, STANDARD.encode(&bytes))))
    }

    /// Resolve an attachment url; relative paths need a configured file base url.
    pub fn attachment_url(&self, url: &str) -> Result<Url> {
        if url.starts_with('/') {
            let base = self.file_base_url.as_ref().ok_or_else(|| {
                GatewayError::BadRequest("relative file url is not supported".to_string())
            })?;
            return base
                .join(url)
                .map_err(|_| GatewayError::BadRequest("invalid file url".to_string()));
        }

        let parsed =
            Url::parse(url).map_err(|_| GatewayError::BadRequest("invalid file url".to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            _ => Err(GatewayError::BadRequest(
                "file url must be http(s) or a data uri".to_string(),
            )),
        }
    }
}

// system prompt + user turn, with the attachment folded in
pub fn build_messages(req: &ChatRequest, image: Option<&str>) -> Vec<CompletionMessage> {
    let system = CompletionMessage {
        role: "system",
        content: MessageContent::Text(req.chat_type.system_prompt().to_string()),
    };

    let user_content = match (image, &req.file_url) {
        (Some(data_uri), _) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: req.message.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_uri.to_string(),
                    detail: "high",
                },
            },
        ]),
        (None, Some(url)) => {
            let name = req.file_name.as_deref().unwrap_or(url.as_str());
            MessageContent::Text(format!("{}\n\nFile Name: {}", req.message, name))
        }
        (None, None) => MessageContent::Text(req.message.clone()),
    };

    vec![
        system,
        CompletionMessage {
            role: "user",
            content: user_content,
        },
    ]
}
