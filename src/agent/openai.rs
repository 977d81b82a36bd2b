//! OpenAI-compatible chat agent
//!
//! Streams `chat/completions` server-sent events and re-emits them as
//! `AgentEvent`s. The reader task stops as soon as the consumer drops
//! its `AgentRun`, which cancels the HTTP transfer.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use super::{AgentError, AgentEvent, AgentRun, ChatAgent};
use crate::config::AgentConfig;

pub struct OpenAiAgent {
    client: reqwest::Client,
    config: AgentConfig,
}

impl OpenAiAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChatAgent for OpenAiAgent {
    async fn run(&self, prompt: &str) -> Result<AgentRun, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.1,
            "stream": true,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, run) = AgentRun::channel(32);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut content = String::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let _ = tx.send(Err(AgentError::Stream(err.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        continue;
                    }

                    let Ok(value) = serde_json::from_str::<serde_json::Value>(data)
                    else {
                        // Malformed SSE frame; drop it rather than kill
                        // the whole run.
                        tracing::warn!(frame = %data, "Unparseable agent stream frame");
                        continue;
                    };
                    if let Some(delta) =
                        value["choices"][0]["delta"]["content"].as_str()
                    {
                        content.push_str(delta);
                        if tx
                            .send(Ok(AgentEvent::Delta(delta.to_string())))
                            .await
                            .is_err()
                        {
                            // Consumer gave up (deadline); abandon the run.
                            return;
                        }
                    }
                }
            }

            let _ = tx.send(Ok(AgentEvent::Message(content))).await;
        });

        Ok(run)
    }
}
