use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Assistant,
    System,
    Error,
}

const MESSAGE_BASE_CLASS: &str = "slds-box slds-box_x-small slds-p-around_small";

/// One transcript entry. Entries are never rewritten once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.kind == MessageType::User
    }

    pub fn container_class(&self) -> &'static str {
        match self.kind {
            MessageType::User => "slds-m-bottom_small slds-text-align_right",
            _ => "slds-m-bottom_small",
        }
    }

    pub fn message_class(&self) -> String {
        match self.kind {
            MessageType::User => format!("{MESSAGE_BASE_CLASS} slds-theme_shade"),
            MessageType::Error => format!("{MESSAGE_BASE_CLASS} slds-theme_error"),
            _ => MESSAGE_BASE_CLASS.to_string(),
        }
    }
}

/// Case record as returned by the case service. Only the description is read;
/// everything else is kept as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarCase {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    pub url: String,
    /// Rounded percentage.
    pub similarity: i64,
    /// Remaining raw fields (subject, case number, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExternalInfoItem {
    pub title: String,
    pub url: String,
    pub similarity: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalImageItem {
    pub id: String,
    pub src: Option<String>,
    pub header: String,
    pub description: String,
    pub alternative_text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Everything derived from one analysis payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLists {
    pub similar_cases: Vec<SimilarCase>,
    pub external_info: Vec<ExternalInfoItem>,
    pub external_images: Vec<ExternalImageItem>,
    pub recommendations: Vec<Recommendation>,
}

impl DisplayLists {
    pub fn is_empty(&self) -> bool {
        self.similar_cases.is_empty()
            && self.external_info.is_empty()
            && self.external_images.is_empty()
            && self.recommendations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(kind: MessageType) -> ChatMessage {
        ChatMessage {
            id: "1".into(),
            kind,
            text: "hi".into(),
            timestamp: "10:00".into(),
        }
    }

    #[test]
    fn test_presentation_tags() {
        let user = message(MessageType::User);
        assert!(user.is_user());
        assert!(user.container_class().ends_with("slds-text-align_right"));
        assert!(user.message_class().ends_with("slds-theme_shade"));

        let error = message(MessageType::Error);
        assert!(!error.is_user());
        assert_eq!(error.container_class(), "slds-m-bottom_small");
        assert!(error.message_class().ends_with("slds-theme_error"));

        assert_eq!(message(MessageType::System).message_class(), MESSAGE_BASE_CLASS);
    }

    #[test]
    fn test_history_entry_without_id_or_timestamp() {
        let parsed: ChatMessage =
            serde_json::from_str(r#"{"type":"assistant","text":"hello"}"#).unwrap();
        assert_eq!(parsed.kind, MessageType::Assistant);
        assert!(parsed.id.is_empty());
        assert!(parsed.timestamp.is_empty());
    }

    #[test]
    fn test_case_record_keeps_extra_fields() {
        let record: CaseRecord =
            serde_json::from_str(r#"{"Id":"500x","Description":"Broken","Subject":"Login"}"#)
                .unwrap();
        assert_eq!(record.description.as_deref(), Some("Broken"));
        assert_eq!(record.fields.get("Subject"), Some(&Value::from("Login")));
    }
}
