//! End-to-end pipeline tests: register a document, let the published
//! event flow through the broker and dispatcher into the parse
//! orchestrator, and assert on the persisted outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use vitae_server::agent::{AgentError, AgentEvent, AgentRun, ChatAgent};
use vitae_server::broker::{MemoryBroker, MessageQueue};
use vitae_server::config::ParserConfig;
use vitae_server::db::{create_pool, DocumentStore};
use vitae_server::document::ParseState;
use vitae_server::ingest::{
    Dispatcher, EventPublisher, IngestService, MonotonicIdGenerator, PublisherConfig,
    RegisterDocument,
};
use vitae_server::parser::{ExtractError, ParseOrchestrator, TextExtractor};
use vitae_server::storage::{ObjectStore, StorageError};

const TOPIC: &str = "resume.parse";

struct MemoryStore;

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        _key: &str,
        _data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
        Ok(b"%PDF-1.4 resume bytes".to_vec())
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        _ttl: Option<Duration>,
    ) -> Result<String, StorageError> {
        Ok(format!("http://storage.local/get/{key}"))
    }

    async fn presigned_put_url(
        &self,
        key: &str,
        _ttl: Option<Duration>,
    ) -> Result<String, StorageError> {
        Ok(format!("http://storage.local/put/{key}"))
    }
}

struct FixedExtractor;

#[async_trait]
impl TextExtractor for FixedExtractor {
    async fn extract(&self, _data: &[u8]) -> Result<String, ExtractError> {
        Ok("Jane Doe, senior engineer, 8 years of Rust and distributed systems"
            .to_string())
    }
}

/// Emits a canned response, optionally never completing.
struct CannedAgent {
    response: Option<&'static str>,
}

#[async_trait]
impl ChatAgent for CannedAgent {
    async fn run(&self, _prompt: &str) -> Result<AgentRun, AgentError> {
        let (tx, run) = AgentRun::channel(8);
        match self.response {
            Some(response) => {
                let content = response.to_string();
                tokio::spawn(async move {
                    let _ = tx.send(Ok(AgentEvent::Delta(content.clone()))).await;
                    let _ = tx.send(Ok(AgentEvent::Message(content))).await;
                });
            }
            None => {
                tokio::spawn(async move {
                    let _tx = tx;
                    std::future::pending::<()>().await;
                });
            }
        }
        Ok(run)
    }
}

struct Pipeline {
    ingest: IngestService,
    registry: DocumentStore,
    shutdown: watch::Sender<bool>,
    consumer: tokio::task::JoinHandle<Result<(), vitae_server::broker::BrokerError>>,
}

async fn start_pipeline(agent: CannedAgent, deadline: Duration) -> Pipeline {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    let registry = DocumentStore::new(pool);

    let broker: Arc<dyn MessageQueue> = Arc::new(MemoryBroker::new(4));
    let subscription = broker.subscribe(&[TOPIC.to_string()]).await.unwrap();

    let (publisher, _worker) =
        EventPublisher::spawn(broker.clone(), PublisherConfig::new(TOPIC, 16));
    let ingest = IngestService::new(
        Arc::new(MonotonicIdGenerator::new()),
        Arc::new(MemoryStore),
        registry.clone(),
        publisher,
    );

    let orchestrator = Arc::new(ParseOrchestrator::new(
        Arc::new(MemoryStore),
        Arc::new(FixedExtractor),
        Arc::new(agent),
        registry.clone(),
        ParserConfig { deadline },
    ));

    let (shutdown, shutdown_rx) = watch::channel(false);
    let dispatcher =
        Dispatcher::new(subscription, orchestrator, broker, TOPIC, shutdown_rx);
    let consumer = tokio::spawn(dispatcher.run());

    Pipeline {
        ingest,
        registry,
        shutdown,
        consumer,
    }
}

async fn wait_for_terminal_state(
    registry: &DocumentStore,
    id: i64,
    timeout: Duration,
) -> ParseState {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let document = registry.get(id).await.unwrap();
        if document.parse_state.is_terminal() {
            return document.parse_state;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("document {id} never left Parsing");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_register_flows_through_to_parse_success() {
    let pipeline = start_pipeline(
        CannedAgent {
            response: Some(
                r#"{"basic_info":{"name":"Jane Doe","email":"jane@example.com"},
                    "skills":["rust","sql"]}"#,
            ),
        },
        Duration::from_secs(10),
    )
    .await;

    let document = pipeline
        .ingest
        .register_document(
            7,
            RegisterDocument {
                file_id: 42,
                file_key: "resume/7/42.pdf".to_string(),
                filename: "cv.pdf".to_string(),
                filetype: "pdf".to_string(),
                filesize: 10_240,
            },
        )
        .await
        .unwrap();
    assert_eq!(document.parse_state, ParseState::Parsing);

    let state =
        wait_for_terminal_state(&pipeline.registry, 42, Duration::from_secs(5)).await;
    assert_eq!(state, ParseState::Succeeded);

    let stored = pipeline.registry.get(42).await.unwrap();
    assert!(stored.llm_parse_content.contains("Jane Doe"));
    assert!(stored.parse_error.is_empty());
    assert_eq!(stored.wire_status(), 3);

    pipeline.shutdown.send(true).unwrap();
    pipeline.consumer.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_chatty_agent_output_still_succeeds() {
    let pipeline = start_pipeline(
        CannedAgent {
            response: Some(r#"Sure, here you go: {"skills":["go","kafka"]} hope it helps"#),
        },
        Duration::from_secs(10),
    )
    .await;

    pipeline
        .ingest
        .register_document(
            9,
            RegisterDocument {
                file_id: 100,
                file_key: "resume/9/100.pdf".to_string(),
                filename: "resume.pdf".to_string(),
                filetype: "pdf".to_string(),
                filesize: 2_048,
            },
        )
        .await
        .unwrap();

    let state =
        wait_for_terminal_state(&pipeline.registry, 100, Duration::from_secs(5)).await;
    assert_eq!(state, ParseState::Succeeded);

    let stored = pipeline.registry.get(100).await.unwrap();
    assert!(stored.llm_parse_content.contains("kafka"));

    pipeline.shutdown.send(true).unwrap();
    pipeline.consumer.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stalled_agent_marks_failed_within_deadline() {
    let pipeline =
        start_pipeline(CannedAgent { response: None }, Duration::from_millis(300)).await;

    pipeline
        .ingest
        .register_document(
            3,
            RegisterDocument {
                file_id: 55,
                file_key: "resume/3/55.pdf".to_string(),
                filename: "cv.pdf".to_string(),
                filetype: "pdf".to_string(),
                filesize: 512,
            },
        )
        .await
        .unwrap();

    let state =
        wait_for_terminal_state(&pipeline.registry, 55, Duration::from_secs(5)).await;
    assert_eq!(state, ParseState::Failed);

    let stored = pipeline.registry.get(55).await.unwrap();
    assert!(stored.parse_error.contains("deadline"));
    assert_eq!(stored.wire_status(), 5);

    pipeline.shutdown.send(true).unwrap();
    pipeline.consumer.await.unwrap().unwrap();
}
