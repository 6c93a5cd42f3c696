//! The client for the external chat completion API that answers questions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Something that can answer a prompt with text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `system_prompt` and `user_prompt` as a single request and return
    /// the text of the reply unmodified.
    ///
    /// # Errors
    /// Returns [Error::ExternalService] if the request fails or the reply has no text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, Error>;
}

/// A [CompletionService] that speaks the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client for the API at `base_url`, e.g. "https://api.openai.com/v1".
    ///
    /// Requests that take longer than `timeout` fail.
    ///
    /// # Errors
    /// Returns [Error::ExternalService] if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|error| Error::ExternalService(format!("could not build HTTP client: {error}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, system_prompt: &'a str, user_prompt: &'a str) -> Self {
        Self {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, Error> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::ExternalService("the reply contained no text".to_owned()))
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, Error> {
        if self.api_key.is_empty() {
            return Err(Error::ExternalService(
                "no API key is configured for the assistant".to_owned(),
            ));
        }

        tracing::info!("sending question to completion API with model {}", self.model);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&ChatRequest::new(&self.model, system_prompt, user_prompt))
            .send()
            .await
            .map_err(|error| Error::ExternalService(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "completion API responded with {status}: {body}"
            )));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|error| Error::ExternalService(format!("could not parse reply: {error}")))?
            .into_text()
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::Error;

    use super::CompletionService;

    /// Answers every prompt with a fixed reply and records the prompts it was sent.
    pub(crate) struct StubCompletionService {
        reply: Option<String>,
        pub(crate) prompts: Mutex<Vec<(String, String)>>,
    }

    impl StubCompletionService {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_owned()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionService for StubCompletionService {
        async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, Error> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_owned(), user_prompt.to_owned()));

            self.reply
                .clone()
                .ok_or_else(|| Error::ExternalService("stub failure".to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::Error;

    use super::{ChatRequest, ChatResponse, CompletionService, OpenAiClient};

    #[test]
    fn request_has_system_and_user_messages() {
        let request = ChatRequest::new("gpt-4o-mini", "be brief", "how much?");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "how much?"},
                ],
            })
        );
    }

    #[test]
    fn reads_text_of_first_choice() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "You spent $12.30."}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}},
            ],
        }))
        .unwrap();

        assert_eq!(response.into_text(), Ok("You spent $12.30.".to_owned()));
    }

    #[test]
    fn reply_without_choices_is_external_service_error() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();

        assert!(matches!(response.into_text(), Err(Error::ExternalService(_))));
    }

    #[test]
    fn url_ignores_trailing_slash() {
        let client = OpenAiClient::new(
            "https://api.example.com/v1/",
            "gpt-4o-mini",
            "key",
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            client.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        let client =
            OpenAiClient::new("http://127.0.0.1:9", "gpt-4o-mini", "", Duration::from_secs(1))
                .unwrap();

        let result = client.complete("system", "user").await;

        assert!(matches!(result, Err(Error::ExternalService(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_external_service_error() {
        let client =
            OpenAiClient::new("http://127.0.0.1:9", "gpt-4o-mini", "key", Duration::from_secs(2))
                .unwrap();

        let result = client.complete("system", "user").await;

        assert!(matches!(result, Err(Error::ExternalService(_))));
    }
}
