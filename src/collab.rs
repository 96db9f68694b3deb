//! External collaborator seams (spec §1: "out of scope... treated as
//! interfaces the core consumes or emits events to").
//!
//! The core never talks to a database, HTTP client, or message bus directly;
//! it depends on these traits, which a deployment wires up to the real
//! person-attribute store, campaign-configuration store, and audit sink. The
//! in-memory implementations here exist for tests and local experimentation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::audit::AuditRecord;
use crate::config::CampaignConfig;
use crate::error::Result;
use crate::person::PersonRow;

/// Supplies a person's attribute rows by person identifier.
#[async_trait]
pub trait PersonAttributeStore: Send + Sync {
    async fn person_rows(&self, person_id: &str) -> Result<Vec<PersonRow>>;
}

/// Supplies the set of campaign configurations a request should evaluate.
#[async_trait]
pub trait CampaignConfigStore: Send + Sync {
    async fn campaigns(&self) -> Result<Vec<CampaignConfig>>;
}

/// Receives a completed request's audit record.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, audit: AuditRecord) -> Result<()>;
}

/// An in-memory [`PersonAttributeStore`] keyed by person id, for tests.
#[derive(Debug, Default)]
pub struct InMemoryPersonStore {
    rows: RwLock<HashMap<String, Vec<PersonRow>>>,
}

impl InMemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, person_id: impl Into<String>, rows: Vec<PersonRow>) {
        self.rows.write().expect("lock poisoned").insert(person_id.into(), rows);
    }
}

#[async_trait]
impl PersonAttributeStore for InMemoryPersonStore {
    async fn person_rows(&self, person_id: &str) -> Result<Vec<PersonRow>> {
        Ok(self
            .rows
            .read()
            .expect("lock poisoned")
            .get(person_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// An in-memory [`CampaignConfigStore`] holding a fixed snapshot, for tests.
#[derive(Debug, Default)]
pub struct InMemoryCampaignStore {
    campaigns: Vec<CampaignConfig>,
}

impl InMemoryCampaignStore {
    pub fn new(campaigns: Vec<CampaignConfig>) -> Self {
        Self { campaigns }
    }
}

#[async_trait]
impl CampaignConfigStore for InMemoryCampaignStore {
    async fn campaigns(&self) -> Result<Vec<CampaignConfig>> {
        Ok(self.campaigns.clone())
    }
}

/// An [`AuditSink`] that retains every audit record it receives, for tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, audit: AuditRecord) -> Result<()> {
        self.records.write().expect("lock poisoned").push(audit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    #[tokio::test]
    async fn in_memory_person_store_round_trips() {
        let store = InMemoryPersonStore::new();
        store.insert(
            "p1",
            vec![PersonRow::Person {
                attributes: Map::from([("DATE_OF_BIRTH".to_string(), "19650101".to_string())]),
            }],
        );
        let rows = store.person_rows("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(store.person_rows("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_audit_sink_retains_records() {
        let sink = InMemoryAuditSink::new();
        sink.record(AuditRecord::default()).await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }
}
