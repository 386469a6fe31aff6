//! Chat completion client for OpenAI-compatible endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use mercato_core::{ChatCompletionPort, ChatTurn, ProviderError};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::ChatConfig;
use crate::http::{HttpBackend, HttpRequest, Method, endpoint};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatClient {
    backend: Arc<dyn HttpBackend>,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn HttpBackend>, config: ChatConfig) -> Self {
        Self { backend, config }
    }
}

#[async_trait]
impl ChatCompletionPort for ChatClient {
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("chat completion (AI_API_KEY)".into()))?;

        let messages: Vec<_> = turns
            .iter()
            .map(|t| json!({"role": t.role.as_str(), "content": t.content}))
            .collect();
        let url = endpoint(&self.config.api_base, "chat/completions")?;
        let request = HttpRequest::new(Method::Post, url)
            .bearer(Some(key))
            .json(json!({"model": model, "messages": messages}));

        let response: CompletionResponse = self.backend.send(&request).await?.json()?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("completion has no content".into()))?;
        debug!(model, turns = turns.len(), chars = content.len(), "Completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use crate::http::testing::FakeBackend;
    use mercato_core::MessageRole;

    fn config() -> ChatConfig {
        ChatConfig {
            api_base: "https://llm.example.com/v1".to_string(),
            api_key: Some("sk-ai".to_string()),
        }
    }

    #[tokio::test]
    async fn test_complete_sends_turns_in_order() {
        let backend = Arc::new(FakeBackend::new().with_json(
            "/chat/completions",
            json!({"choices": [{"message": {"role": "assistant", "content": "Hello!"}}]}),
        ));
        let client = ChatClient::new(backend.clone(), config());
        let turns = [
            ChatTurn::new(MessageRole::System, "Be brief."),
            ChatTurn::new(MessageRole::User, "Hi"),
        ];

        let answer = client.complete("gpt-4o-mini", &turns).await.unwrap();
        assert_eq!(answer, "Hello!");

        let request = backend.last_request();
        assert_eq!(request.bearer.as_deref(), Some("sk-ai"));
        let Body::Json(body) = request.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
    }

    #[tokio::test]
    async fn test_empty_choices_are_invalid() {
        let backend = Arc::new(FakeBackend::new().with_json("/chat", json!({"choices": []})));
        let err = ChatClient::new(backend, config())
            .complete("m", &[ChatTurn::new(MessageRole::User, "Hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_upstream_outage_is_unavailable() {
        let backend = Arc::new(FakeBackend::new().with_status("/chat", 503));
        let err = ChatClient::new(backend, config())
            .complete("m", &[ChatTurn::new(MessageRole::User, "Hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = ChatClient::new(Arc::new(FakeBackend::new()), ChatConfig::default());
        let err = client.complete("m", &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
