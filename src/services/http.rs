use super::{CaseService, ChatHistoryStore, ServiceError, ServiceResult};
use crate::config::Settings;
use crate::types::{CaseRecord, ChatMessage, MessageType};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// REST gateway client for case records, analysis and chat history.
pub struct HttpGateway {
    client: Client,
    api_base: String,
    analysis_endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    case_id: &'a str,
    question: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveMessageRequest<'a> {
    case_id: &'a str,
    message_text: &'a str,
    message_type: MessageType,
}

impl HttpGateway {
    pub fn new(settings: &Settings) -> ServiceResult<Self> {
        if settings.api_base.trim().is_empty() {
            return Err(ServiceError::NotConfigured("CASE_ASSISTANT_API_BASE"));
        }
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            analysis_endpoint: settings.analysis_endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn case_url(&self, case_id: &str) -> String {
        format!("{}/cases/{}", self.api_base, case_id)
    }

    fn history_url(&self, case_id: &str) -> String {
        format!("{}/cases/{}/chat-history", self.api_base, case_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ServiceResult<String> {
        let response: Response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ServiceResult<T> {
        let body = self.send(self.client.get(url)).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CaseService for HttpGateway {
    async fn fetch_case_details(&self, case_id: &str) -> ServiceResult<CaseRecord> {
        self.get_json(&self.case_url(case_id)).await
    }

    async fn analyze_case(&self, case_id: &str, question: &str) -> ServiceResult<String> {
        let request = self
            .client
            .post(&self.analysis_endpoint)
            .json(&AnalyzeRequest { case_id, question });
        self.send(request).await
    }
}

#[async_trait]
impl ChatHistoryStore for HttpGateway {
    async fn load_chat_history(&self, case_id: &str) -> ServiceResult<Vec<ChatMessage>> {
        let history: Option<Vec<ChatMessage>> = self.get_json(&self.history_url(case_id)).await?;
        Ok(history.unwrap_or_default())
    }

    async fn save_chat_message(
        &self,
        case_id: &str,
        text: &str,
        kind: MessageType,
    ) -> ServiceResult<()> {
        let request = self
            .client
            .post(self.history_url(case_id))
            .json(&SaveMessageRequest {
                case_id,
                message_text: text,
                message_type: kind,
            });
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let gateway = HttpGateway::new(&Settings::new("https://gw.example.com")).unwrap();
        assert_eq!(gateway.case_url("500A"), "https://gw.example.com/cases/500A");
        assert_eq!(
            gateway.history_url("500A"),
            "https://gw.example.com/cases/500A/chat-history"
        );
    }

    #[test]
    fn test_empty_api_base_is_rejected() {
        let err = HttpGateway::new(&Settings::new("")).err().unwrap();
        assert!(matches!(err, ServiceError::NotConfigured("CASE_ASSISTANT_API_BASE")));
        assert_eq!(err.to_string(), "CASE_ASSISTANT_API_BASE is not configured");
    }

    #[test]
    fn test_save_request_shape() {
        let body = serde_json::to_value(SaveMessageRequest {
            case_id: "500A",
            message_text: "hello",
            message_type: MessageType::Assistant,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"caseId": "500A", "messageText": "hello", "messageType": "assistant"})
        );
    }
}
