use bon::Builder;
use serde::Serialize;
use uuid::Uuid;

/// Body for `POST /session`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
pub struct LoginRequest {
    /// Username to log in as (registered on first use)
    #[builder(into)]
    pub name: String,
}

/// Body for creating a conversation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
pub struct CreateConversationRequest {
    /// Participant user ids (the creator included)
    pub participants: Vec<Uuid>,
    /// Group name, omitted for direct conversations
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body for sending a message. At least one of `content` and `image_url`
/// should be set; the server rejects empty messages.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
pub struct SendMessageRequest {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[builder(into)]
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_conversation_omits_absent_name() {
        let request = CreateConversationRequest::builder()
            .participants(vec![])
            .build();

        let json = serde_json::to_string(&request).expect("request should serialize");
        assert_eq!(json, r#"{"participants":[]}"#);
    }

    #[test]
    fn send_message_serializes_camel_case_image_url() {
        let request = SendMessageRequest::builder()
            .content("look at this")
            .image_url("data:image/png;base64,AAAA")
            .build();

        let json = serde_json::to_string(&request).expect("request should serialize");
        assert_eq!(
            json,
            r#"{"content":"look at this","imageUrl":"data:image/png;base64,AAAA"}"#
        );
    }
}
