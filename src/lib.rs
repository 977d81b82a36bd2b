//! Vitae Server Library
//!
//! Asynchronous resume ingestion: clients upload bytes straight to
//! object storage through presigned URLs, register the document, and a
//! broker-driven consumer parses it with a language-model agent and
//! persists the structured result.
//!
//! # Modules
//!
//! - `ingest`: upload coordination, registration, event publish/consume
//! - `parser`: the parsing orchestrator and its text/JSON plumbing
//! - `broker`: message queue traits + in-process partitioned broker
//! - `agent`: language-model collaborator
//! - `storage` / `db`: object storage and the document registry

pub mod agent;
pub mod broker;
pub mod config;
pub mod db;
pub mod document;
pub mod ingest;
pub mod parser;
pub mod routes;
pub mod state;
pub mod storage;
