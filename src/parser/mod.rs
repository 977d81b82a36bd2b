//! Parsing orchestrator
//!
//! Drives one ingestion event through fetch, text extraction, the
//! language-model agent, validation and persistence, all under a single
//! wall-clock deadline. Success and failure both terminate the
//! document's parse lifecycle; only infrastructure failures leave it in
//! `Parsing` so an external re-publish can retry.

mod extract;
mod json_extract;
mod prompt;
mod types;

pub use extract::{
    decode_readable, readability_score, ExtractError, PdfTextExtractor,
    TextExtractor, READABILITY_THRESHOLD,
};
pub use json_extract::extract_json_object;
pub use prompt::build_prompt;
pub use types::{BasicInfo, Education, ParseResult, WorkExperience};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::agent::{AgentError, AgentEvent, ChatAgent};
use crate::config::ParserConfig;
use crate::db::{DbError, DocumentStore};
use crate::ingest::{EventHandler, IngestionEvent};
use crate::storage::{ObjectStore, StorageError};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("storage fetch failed: {0}")]
    StorageFetch(#[from] StorageError),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("no candidate encoding produced readable text")]
    Unreadable,

    #[error("parse deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("agent returned no content")]
    EmptyResponse,

    #[error("agent response is not parseable as a result object")]
    ResponseParse,

    #[error("parse result has no substantive content")]
    InvalidResult,

    #[error("registry write failed: {0}")]
    Registry(#[from] DbError),
}

impl ParseError {
    /// Whether this failure class leaves the document in `Parsing`.
    ///
    /// Infrastructure failures are retryable by re-publishing the event,
    /// so they do not burn the document's terminal state. Content and
    /// agent failures do: retrying them without intervention would just
    /// fail again.
    fn leaves_document_parsing(&self) -> bool {
        matches!(self, ParseError::StorageFetch(_) | ParseError::Registry(_))
    }
}

pub struct ParseOrchestrator {
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    agent: Arc<dyn ChatAgent>,
    registry: DocumentStore,
    config: ParserConfig,
}

impl ParseOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        agent: Arc<dyn ChatAgent>,
        registry: DocumentStore,
        config: ParserConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            agent,
            registry,
            config,
        }
    }

    /// Handle one ingestion event end to end.
    ///
    /// The deadline covers everything including the success write; when
    /// it fires, the in-flight agent run is dropped (best-effort
    /// cancellation) and no partial result is ever persisted.
    pub async fn handle_event(&self, event: &IngestionEvent) -> Result<(), ParseError> {
        let deadline = self.config.deadline;
        let outcome = tokio::time::timeout(deadline, self.parse_and_store(event)).await;

        let err = match outcome {
            Ok(Ok(())) => {
                tracing::info!(
                    file_id = event.file_id,
                    file_key = %event.file_key,
                    "Document parsed"
                );
                return Ok(());
            }
            Ok(Err(err)) => err,
            Err(_) => ParseError::DeadlineExceeded(deadline),
        };

        tracing::error!(
            file_id = event.file_id,
            file_key = %event.file_key,
            error = %err,
            "Parse failed"
        );

        if !err.leaves_document_parsing() {
            if let Err(db_err) = self
                .registry
                .mark_parse_failed(event.file_id, &err.to_string())
                .await
            {
                tracing::error!(
                    file_id = event.file_id,
                    error = %db_err,
                    "Could not record parse failure"
                );
            }
        }

        Err(err)
    }

    async fn parse_and_store(&self, event: &IngestionEvent) -> Result<(), ParseError> {
        let data = self.store.get(&event.file_key).await?;

        let raw_text = self
            .extractor
            .extract(&data)
            .await
            .map_err(|e| ParseError::Extraction(e.to_string()))?;
        let text = decode_readable(&raw_text).ok_or(ParseError::Unreadable)?;

        let prompt = build_prompt(&text);
        let mut run = self.agent.run(&prompt).await?;

        // Keep only the final complete message; deltas are progress noise.
        let mut last_message: Option<String> = None;
        while let Some(agent_event) = run.next_event().await {
            match agent_event? {
                AgentEvent::Message(content) => last_message = Some(content),
                AgentEvent::Delta(_) => {}
            }
        }

        let response = last_message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ParseError::EmptyResponse)?;

        let result = parse_agent_response(&response)?;
        if !result.is_substantive() {
            return Err(ParseError::InvalidResult);
        }

        let serialized =
            serde_json::to_string(&result).map_err(|_| ParseError::ResponseParse)?;
        self.registry
            .mark_parse_succeeded(event.file_id, &serialized)
            .await?;
        Ok(())
    }
}

/// Parse the agent's response, falling back to balanced-brace recovery
/// when the message is not pure JSON.
pub fn parse_agent_response(response: &str) -> Result<ParseResult, ParseError> {
    if let Ok(result) = serde_json::from_str::<ParseResult>(response) {
        return Ok(result);
    }
    let recovered = extract_json_object(response).ok_or(ParseError::ResponseParse)?;
    serde_json::from_str(recovered).map_err(|_| ParseError::ResponseParse)
}

#[async_trait]
impl EventHandler for ParseOrchestrator {
    async fn handle(&self, event: IngestionEvent) -> anyhow::Result<()> {
        self.handle_event(&event).await?;
        Ok(())
    }
}
