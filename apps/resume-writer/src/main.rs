mod config;
mod errors;
mod generation;
mod llm_client;
mod models;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::generator::respond;
use crate::llm_client::LlmClient;
use crate::models::summary::SummaryResponse;

/// Reads one request from stdin, writes one response line to stdout.
///
/// Always exits 0. Failures are logged to stderr and surface to the caller
/// only as an empty `summary` and `bullets`.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok(); // load .env if present; ignore if missing

    // stdout carries the response, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME")))
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let config = Config::from_env();
    info!(
        "Starting resume-writer v{} (model: {}, max_new_tokens: {})",
        env!("CARGO_PKG_VERSION"),
        config.model,
        config.max_new_tokens
    );

    let raw = read_request_text(tokio::io::stdin()).await;

    let response = match LlmClient::new(&config) {
        Ok(llm) => {
            info!("LLM client initialized (endpoint: {})", llm.endpoint());
            respond(&raw, &llm, &config).await
        }
        Err(e) => {
            AppError::from(e).log();
            SummaryResponse::empty()
        }
    };

    if response.is_empty() {
        info!("Emitting empty response; caller should use its own fallback");
    }

    if let Err(e) = emit(&response).await {
        e.log();
    }
}

/// Reads the whole request. A failed read, including non-UTF-8 input, yields
/// an empty string so the request falls back to its defaults.
async fn read_request_text<R>(reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    read_input(reader).await.unwrap_or_else(|e| {
        e.log();
        String::new()
    })
}

async fn read_input<R>(mut reader: R) -> Result<String, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = String::new();
    reader.read_to_string(&mut raw).await?;
    Ok(raw)
}

/// Writes the response as a single JSON line.
async fn emit(response: &SummaryResponse) -> Result<(), AppError> {
    let mut line = serde_json::to_string(response).map_err(|e| AppError::Internal(e.into()))?;
    line.push('\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{LlmError, TextGenerator};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the prompt it receives and echoes a fixed summary.
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _max_new_tokens: u32) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Summary".to_string())
        }
    }

    #[tokio::test]
    async fn test_input_is_read_whole() {
        let raw = read_request_text(&br#"{"domain": "design"}"#[..]).await;
        assert_eq!(raw, r#"{"domain": "design"}"#);
    }

    #[tokio::test]
    async fn test_non_utf8_input_becomes_empty_request() {
        assert!(read_input(&[0xffu8, 0xfe][..]).await.is_err());

        let raw = read_request_text(&[0xffu8, 0xfe][..]).await;
        assert!(raw.is_empty());

        let llm = RecordingGenerator::default();
        let config = Config::from_lookup(|_| None);
        let response = respond(&raw, &llm, &config).await;
        assert_eq!(response.summary, "Summary");

        let prompts = llm.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Domain: generic."));
        assert!(prompts[0].contains("Present skills: \n"));
        assert!(prompts[0].ends_with("Resume text:\n\n\nJSON:"));
    }
}
