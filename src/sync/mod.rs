//! Object store → graph synchronization.
//!
//! For one resource: fetch its row, decode it, upsert the vertex, then create
//! its edges on first import or reconcile them on later ones. Work on one
//! identifier is serialized through `KeyedLocks`; distinct identifiers run
//! concurrently.

use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use crate::import::{GraphStore, Importer};
use crate::record::{decode_record, DecodePolicy, ResourceRecord, RowSource};

mod errors;
mod locks;

pub use errors::SyncError;
pub use locks::{KeyGuard, KeyedLocks};

pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Created,
    Updated,
}

impl SyncOutcome {
    fn from_existed(existed: bool) -> Self {
        if existed {
            SyncOutcome::Updated
        } else {
            SyncOutcome::Created
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub failed: Vec<SyncError>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len() + self.failed.len()
    }

    fn record(&mut self, id: String, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created.push(id),
            SyncOutcome::Updated => self.updated.push(id),
        }
    }
}

pub struct Synchronizer<S, G> {
    source: S,
    importer: Importer<G>,
    policy: DecodePolicy,
    concurrency: usize,
    locks: KeyedLocks,
}

impl<S: RowSource, G: GraphStore> Synchronizer<S, G> {
    pub fn new(source: S, importer: Importer<G>) -> Self {
        Self {
            source,
            importer,
            policy: DecodePolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            locks: KeyedLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn importer(&self) -> &Importer<G> {
        &self.importer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn load(&self, id: &str) -> Result<ResourceRecord, SyncError> {
        let columns = self
            .source
            .fetch_columns(id)
            .await
            .map_err(|source| SyncError::Source {
                id: id.to_string(),
                source,
            })?;
        Ok(decode_record(id, &columns, self.policy)?)
    }

    /// Upsert the vertex; returns whether it existed before.
    async fn write_vertex(&self, record: &ResourceRecord) -> Result<bool, SyncError> {
        let existed = self.importer.exists(&record.id).await?;
        self.importer.create(record).await?;
        Ok(existed)
    }

    async fn write_links(&self, record: &ResourceRecord, existed: bool) -> Result<(), SyncError> {
        if existed {
            self.importer.update_links(record).await?;
        } else {
            self.importer.create_links(record).await?;
        }
        Ok(())
    }

    /// Import one resource.
    pub async fn sync(&self, id: &str) -> Result<SyncOutcome, SyncError> {
        let _guard = self.locks.lock(id).await;
        let record = self.load(id).await?;
        let existed = self.write_vertex(&record).await?;
        self.write_links(&record, existed).await?;

        let outcome = SyncOutcome::from_existed(existed);
        log::info!("Synced {} {} ({:?})", record.resource_type, id, outcome);
        Ok(outcome)
    }

    /// Import a batch. All vertices are written before any edge so that
    /// relations inside the batch find both of their endpoints. Duplicate
    /// ids are imported once; failures are collected, not fatal.
    pub async fn sync_many<I>(&self, ids: I) -> SyncReport
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        let mut report = SyncReport::default();

        let written: Vec<Result<(ResourceRecord, bool), SyncError>> = stream::iter(ids.iter())
            .map(|id| async move {
                let _guard = self.locks.lock(id).await;
                let record = self.load(id).await?;
                let existed = self.write_vertex(&record).await?;
                Ok::<_, SyncError>((record, existed))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut pending = Vec::with_capacity(written.len());
        for result in written {
            match result {
                Ok(written) => pending.push(written),
                Err(e) => {
                    log::warn!("{}", e);
                    report.failed.push(e);
                }
            }
        }

        let linked: Vec<Result<(String, SyncOutcome), SyncError>> = stream::iter(pending)
            .map(|(record, existed)| async move {
                let _guard = self.locks.lock(&record.id).await;
                self.write_links(&record, existed).await?;
                Ok::<_, SyncError>((record.id, SyncOutcome::from_existed(existed)))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for result in linked {
            match result {
                Ok((id, outcome)) => report.record(id, outcome),
                Err(e) => {
                    log::warn!("{}", e);
                    report.failed.push(e);
                }
            }
        }

        log::info!(
            "Synced {} resource(s): {} created, {} updated, {} failed",
            report.total(),
            report.created.len(),
            report.updated.len(),
            report.failed.len()
        );
        report
    }

    /// Remove a resource deleted from the object store.
    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let _guard = self.locks.lock(id).await;
        self.importer.delete(id).await?;
        Ok(())
    }
}
