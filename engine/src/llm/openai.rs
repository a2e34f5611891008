//! OpenAI-compatible streaming provider
//!
//! Talks to any `/chat/completions` endpoint speaking the OpenAI wire format
//! (OpenRouter by default). Requests are always streamed with usage reporting
//! enabled, so the final SSE event carries authoritative token totals.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::sse::{SseDecoder, SseFrame};
use super::{EventStream, GenerationEvent, LLMError, LLMProvider, Message, Usage};
use crate::config::{LLMConfig, SecretString};

pub struct OpenAICompatProvider {
    base_url: String,
    api_key: SecretString,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(config: &LLMConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn stream(&self, model: &str, messages: &[Message]) -> super::Result<EventStream> {
        let url = format!("{}/chat/completions", self.base_url);

        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": model,
            "messages": api_messages,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        tracing::debug!(
            "Chat completion request: model={}, messages={}",
            model,
            messages.len()
        );

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload);

        // Covers connection and the whole streamed body
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, text)),
            });
        }

        let mut body = response.bytes_stream();

        let events = async_stream::stream! {
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(map_reqwest_error(e));
                        return;
                    }
                };

                for frame in decoder.push(&chunk) {
                    match frame {
                        SseFrame::Done => return,
                        SseFrame::Data(data) => match parse_event(&data) {
                            Ok(Some(event)) => yield Ok(event),
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        },
                    }
                }
            }

            if let Some(SseFrame::Data(data)) = decoder.finish() {
                match parse_event(&data) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(events))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout
    } else {
        LLMError::NetworkError(e.to_string())
    }
}

/// Streaming chunk in the OpenAI wire format
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,

    #[serde(default)]
    usage: Option<Usage>,

    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode one SSE data payload into an event.
///
/// Returns `Ok(None)` for payloads carrying neither content nor usage
/// (role announcements, empty deltas).
fn parse_event(data: &str) -> super::Result<Option<GenerationEvent>> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| LLMError::ParseError(format!("Invalid stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(LLMError::InvalidRequest(message));
    }

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());

    if delta.is_none() && chunk.usage.is_none() {
        return Ok(None);
    }

    Ok(Some(GenerationEvent {
        usage: chunk.usage,
        delta,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_event() {
        let event = parse_event(r#"{"choices":[{"index":0,"delta":{"content":"Bon"}}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.delta.as_deref(), Some("Bon"));
        assert!(event.usage.is_none());
    }

    #[test]
    fn test_parse_usage_event() {
        let event = parse_event(
            r#"{"choices":[],"usage":{"prompt_tokens":21,"completion_tokens":4,"total_tokens":25}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            event.usage,
            Some(Usage {
                prompt_tokens: 21,
                completion_tokens: 4
            })
        );
        assert!(event.delta.is_none());
    }

    #[test]
    fn test_parse_role_only_event_is_skipped() {
        let event =
            parse_event(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_parse_error_event() {
        let err = parse_event(r#"{"error":{"message":"model overloaded","code":502}}"#)
            .unwrap_err();
        assert!(matches!(err, LLMError::InvalidRequest(m) if m == "model overloaded"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_event("not json"),
            Err(LLMError::ParseError(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut config = LLMConfig::default();
        config.base_url = "http://localhost:9000/v1/".to_string();
        let provider = OpenAICompatProvider::new(&config);
        assert_eq!(provider.base_url, "http://localhost:9000/v1");
        assert_eq!(provider.name(), "openai-compat");
    }
}
