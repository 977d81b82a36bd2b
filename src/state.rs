//! Application state management

use std::sync::Arc;

use crate::ingest::IngestService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    ingest: IngestService,
}

impl AppState {
    pub fn new(ingest: IngestService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { ingest }),
        }
    }

    pub fn ingest(&self) -> &IngestService {
        &self.inner.ingest
    }
}
