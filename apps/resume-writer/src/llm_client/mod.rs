/// LLM Client — the single point of entry for text generation.
///
/// ARCHITECTURAL RULE: No other module may call the inference endpoint directly.
/// All generation goes through the `TextGenerator` trait defined here.
///
/// The shipped backend talks to a Hugging Face–compatible text-generation
/// inference endpoint. Tests swap in stub generators through the trait.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The generation capability: prompt in, generated text out, or failure.
///
/// Implementations must decode greedily (no sampling) so identical prompts
/// yield identical text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    do_sample: bool,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
    Error { error: String },
}

/// HTTP client for the inference endpoint.
/// One request per call: no retries, no backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", config.api_url, config.model),
            api_token: config.api_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError> {
        let request_body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens,
                do_sample: false,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<InferenceResponse>(&body)
                .ok()
                .and_then(|r| match r {
                    InferenceResponse::Error { error } => Some(error),
                    _ => None,
                })
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = parse_inference_response(&body)?;
        debug!(
            "Generation succeeded: prompt_chars={}, output_chars={}",
            prompt.chars().count(),
            text.chars().count()
        );
        Ok(text)
    }
}

/// Extracts the generated text from an inference response body.
fn parse_inference_response(body: &str) -> Result<String, LlmError> {
    match serde_json::from_str::<InferenceResponse>(body)? {
        InferenceResponse::Batch(outputs) => outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or(LlmError::EmptyContent),
        InferenceResponse::Single(output) => Ok(output.generated_text),
        InferenceResponse::Error { error } => Err(LlmError::Api {
            status: 200,
            message: error,
        }),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"summary\": \"x\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"summary\": \"x\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"summary\": \"x\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"summary\": \"x\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"summary\": \"x\"}\n";
        assert_eq!(strip_json_fences(input), "{\"summary\": \"x\"}");
    }

    #[test]
    fn test_parse_batch_response_takes_first_output() {
        let body = r#"[{"generated_text": "first"}, {"generated_text": "second"}]"#;
        assert_eq!(parse_inference_response(body).unwrap(), "first");
    }

    #[test]
    fn test_parse_single_object_response() {
        let body = r#"{"generated_text": "only"}"#;
        assert_eq!(parse_inference_response(body).unwrap(), "only");
    }

    #[test]
    fn test_parse_empty_batch_is_empty_content() {
        assert!(matches!(
            parse_inference_response("[]"),
            Err(LlmError::EmptyContent)
        ));
    }

    #[test]
    fn test_parse_error_body_is_api_error() {
        let body = r#"{"error": "Model google/flan-t5-small is currently loading"}"#;
        match parse_inference_response(body) {
            Err(LlmError::Api { message, .. }) => assert!(message.contains("loading")),
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_body_is_parse_error() {
        assert!(matches!(
            parse_inference_response("<html>bad gateway</html>"),
            Err(LlmError::Parse(_))
        ));
        assert!(matches!(
            parse_inference_response(r#"[{"text": "wrong field"}]"#),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_request_body_is_greedy() {
        let body = InferenceRequest {
            inputs: "prompt",
            parameters: InferenceParameters {
                max_new_tokens: 64,
                do_sample: false,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["inputs"], "prompt");
        assert_eq!(value["parameters"]["max_new_tokens"], 64);
        assert_eq!(value["parameters"]["do_sample"], false);
        assert!(value["parameters"].get("return_full_text").is_none());
    }

    #[test]
    fn test_endpoint_joins_base_url_and_model() {
        let config = Config::from_lookup(|key| match key {
            "LLM_API_URL" => Some("http://localhost:3000/models/".to_string()),
            "LLM_MODEL" => Some("google/flan-t5-base".to_string()),
            _ => None,
        });
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:3000/models/google/flan-t5-base"
        );
    }

    /// Serves one canned HTTP response on a local port and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/models")
    }

    /// True once the headers and the full `content-length` body have arrived.
    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn client_for(base_url: String) -> LlmClient {
        let config = Config::from_lookup(move |key| {
            (key == "LLM_API_URL").then(|| base_url.clone())
        });
        LlmClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_first_generated_text() {
        let base = serve_once("200 OK", r#"[{"generated_text":"Summary\n- did X"}]"#).await;
        let text = client_for(base).generate("prompt", 16).await.unwrap();
        assert_eq!(text, "Summary\n- did X");
    }

    #[tokio::test]
    async fn test_error_status_uses_error_body_message() {
        let base = serve_once("503 Service Unavailable", r#"{"error":"loading"}"#).await;
        match client_for(base).generate("prompt", 16).await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "loading");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_error_field_keeps_raw_body() {
        let base = serve_once("404 Not Found", "Not Found").await;
        match client_for(base).generate("prompt", 16).await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
