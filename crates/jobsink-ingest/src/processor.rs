//! Create-or-update reconciliation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use jobsink_core::{BatchSummary, JobCandidate, JobProcessor, JobStore, Outcome, StoreError};

/// Reconciles candidates against the store keyed by external identity.
///
/// The store is injected at construction so tests can substitute an
/// in-memory fake.
pub struct Processor {
    store: Arc<dyn JobStore>,
}

impl Processor {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Reconcile one candidate.
    ///
    /// A candidate missing any identity-bearing field fails validation with
    /// no store mutation. Otherwise the store is probed by `external_id OR
    /// url`: a match is overwritten in place (`Updated`), a miss is inserted
    /// (`Created`). Losing the lookup/insert race to a concurrent writer is
    /// recovered by re-looking-up and updating; store backend errors come
    /// back as retriable failures for the queue to re-attempt.
    pub async fn process(&self, candidate: &JobCandidate) -> Outcome {
        if let Some(field) = first_missing_identity_field(candidate) {
            return Outcome::Failed {
                reason: format!("missing required field: {field}"),
                retriable: false,
            };
        }

        match self
            .store
            .find_by_identity(&candidate.external_id, &candidate.url)
            .await
        {
            Ok(Some(existing)) => self.overwrite(existing.id, candidate).await,
            Ok(None) => self.create(candidate).await,
            Err(e) => backend_failure(&e),
        }
    }

    /// Process a batch independently and concurrently.
    ///
    /// One item's failure never aborts the batch; counts and failure reasons
    /// are aggregated in completion order.
    pub async fn process_batch(
        &self,
        candidates: &[JobCandidate],
        max_concurrent: usize,
    ) -> BatchSummary {
        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|candidate| self.process(candidate))
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }
        summary
    }

    async fn create(&self, candidate: &JobCandidate) -> Outcome {
        match self.store.insert(candidate).await {
            Ok(_) => Outcome::Created,
            Err(StoreError::DuplicateIdentity(_)) => {
                // A concurrent writer inserted the same identity between our
                // lookup and insert; the uniqueness constraint is the
                // backstop. Recover by treating it as the updated case.
                tracing::debug!(
                    external_id = %candidate.external_id,
                    "insert lost identity race; falling back to update"
                );
                match self
                    .store
                    .find_by_identity(&candidate.external_id, &candidate.url)
                    .await
                {
                    Ok(Some(existing)) => self.overwrite(existing.id, candidate).await,
                    Ok(None) => Outcome::Failed {
                        reason: format!(
                            "identity conflict: insert rejected for {} but no matching record found",
                            candidate.external_id
                        ),
                        retriable: false,
                    },
                    Err(e) => backend_failure(&e),
                }
            }
            Err(e) => backend_failure(&e),
        }
    }

    async fn overwrite(&self, id: i64, candidate: &JobCandidate) -> Outcome {
        match self.store.update(id, candidate).await {
            Ok(_) => Outcome::Updated,
            Err(e) => backend_failure(&e),
        }
    }
}

#[async_trait]
impl JobProcessor for Processor {
    async fn process(&self, candidate: &JobCandidate) -> Outcome {
        Processor::process(self, candidate).await
    }
}

fn first_missing_identity_field(candidate: &JobCandidate) -> Option<&'static str> {
    if candidate.external_id.trim().is_empty() {
        return Some("externalId");
    }
    if candidate.title.trim().is_empty() {
        return Some("title");
    }
    if candidate.company.trim().is_empty() {
        return Some("company");
    }
    if candidate.url.trim().is_empty() {
        return Some("url");
    }
    None
}

fn backend_failure(error: &StoreError) -> Outcome {
    match error {
        StoreError::DuplicateIdentity(id) => Outcome::Failed {
            reason: format!("identity conflict: {id}"),
            retriable: false,
        },
        other => Outcome::Failed {
            reason: other.to_string(),
            retriable: true,
        },
    }
}
