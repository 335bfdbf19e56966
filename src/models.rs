use serde::{Deserialize, Serialize};

// Conversation modes offered by the UI
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChatType {
    SymptomChecker,
    ReportAnalyzer,
    MentalHealth,
}

impl ChatType {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            ChatType::SymptomChecker => {
                "You are a medical AI assistant helping with symptom checking. Be thorough but cautious in your assessment."
            }
            ChatType::ReportAnalyzer => {
                "You are a medical AI assistant analyzing medical reports and test results. Focus on explaining the results clearly and professionally. When analyzing reports, highlight any abnormal values and explain their significance."
            }
            ChatType::MentalHealth => {
                "You are a supportive mental health AI assistant. Be empathetic and professional."
            }
        }
    }
}

// Chat API request format
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub message: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl ChatRequest {
    pub fn has_image(&self) -> bool {
        self.file_url.is_some()
            && self
                .file_type
                .as_deref()
                .is_some_and(|t| t.starts_with("image/"))
    }
}

// Chat API response format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatResponse {
    pub message: String,
}

// OpenAI compatible wire format

#[derive(Serialize, Clone, Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Serialize, Clone, Debug)]
pub struct CompletionMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Clone, Debug)]
pub struct ImageUrl {
    pub url: String,
    pub detail: &'static str,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CompletionChoice {
    pub message: CompletionChoiceMessage,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CompletionChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_from_ui_json() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"type":"report-analyzer","message":"see attached","fileUrl":"https://files/abc","fileType":"image/png"}"#,
        )
        .unwrap();

        assert_eq!(req.chat_type, ChatType::ReportAnalyzer);
        assert_eq!(req.file_url.as_deref(), Some("https://files/abc"));
        assert!(req.has_image());
    }

    #[test]
    fn test_pdf_is_not_an_image() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"type":"report-analyzer","message":"m","fileUrl":"u","fileType":"application/pdf"}"#,
        )
        .unwrap();
        assert!(!req.has_image());
    }

    #[test]
    fn test_unknown_chat_type_rejected() {
        let result: Result<ChatRequest, _> =
            serde_json::from_str(r#"{"type":"dermatology","message":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_image_part_wire_format() {
        let part = ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: "data:image/png;base64,AAA".into(),
                detail: "high",
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["detail"], "high");
    }
}
