//! Minimal adapter for schema tests

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{
    Capabilities, EngineResult, Filter, OrderBy, Page, Pagination, Record, RecordId,
    StorageAdapter,
};

/// Adapter that stores nothing and reports configurable capabilities
#[derive(Debug)]
pub struct StubAdapter {
    name: String,
    capabilities: Capabilities,
}

impl StubAdapter {
    pub fn shared(name: &str, capabilities: Capabilities) -> Arc<dyn StorageAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            capabilities,
        })
    }
}

#[async_trait]
impl StorageAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn find(&self, _: &Filter, _: Pagination, _: Option<&OrderBy>) -> EngineResult<Page> {
        Ok(Page::default())
    }

    async fn find_one(&self, _: &Filter) -> EngineResult<Option<Record>> {
        Ok(None)
    }

    async fn find_one_by_id(&self, _: &RecordId) -> EngineResult<Option<Record>> {
        Ok(None)
    }

    async fn create(&self, payload: Record) -> EngineResult<Record> {
        Ok(payload)
    }

    async fn update(&self, _: &Filter, _: Record) -> EngineResult<()> {
        Ok(())
    }

    async fn delete(&self, _: &Filter) -> EngineResult<()> {
        Ok(())
    }
}
