use serde::{Deserialize, Serialize};

use crate::models::{Attachment, FeedbackState, Language};

// -- Inference actions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatAction {
    #[serde(rename = "solve")]
    Solve,
    #[serde(rename = "explainImage")]
    ExplainImage,
    #[serde(rename = "generateQuiz")]
    GenerateQuiz,
}

/// Action descriptor accepted by the inference proxy endpoint and passed to
/// the gateway client. Field names match the wire format of the web client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: ChatAction,
    #[serde(default)]
    pub language: Language,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_questions: Option<u32>,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameConversationRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRequest {
    pub feedback: FeedbackState,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    /// Feedback state after the call; `None` when the toggle cleared it.
    pub feedback: Option<FeedbackState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub topic: String,
    pub level: String,
    pub num_questions: u32,
    #[serde(default)]
    pub language: Language,
}

// -- Corpus --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddDocumentRequest {
    pub name: String,
    pub content: String,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_accepts_the_web_client_wire_format() {
        let raw = r#"{
            "action": "explainImage",
            "language": "ar",
            "prompt": "ما هذا؟",
            "corpusContent": "--- Document : X ---\nY",
            "imageBase64": "AAAA",
            "mimeType": "image/png"
        }"#;

        let request: ActionRequest = serde_json::from_str(raw).expect("should deserialize");
        assert_eq!(request.action, ChatAction::ExplainImage);
        assert_eq!(request.language, Language::Ar);
        assert_eq!(request.mime_type.as_deref(), Some("image/png"));
        assert_eq!(request.num_questions, None);
    }

    #[test]
    fn quiz_action_carries_level_and_question_count() {
        let raw = r#"{"action":"generateQuiz","prompt":"fractions","level":"M7","numQuestions":3}"#;
        let request: ActionRequest = serde_json::from_str(raw).expect("should deserialize");
        assert_eq!(request.action, ChatAction::GenerateQuiz);
        assert_eq!(request.language, Language::Fr);
        assert_eq!(request.level.as_deref(), Some("M7"));
        assert_eq!(request.num_questions, Some(3));
    }
}
